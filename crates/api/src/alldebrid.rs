//! AllDebrid link-unlocking preprocessor (SPEC_FULL §4.6): on first use, logs
//! in with a username/password, fetches the supported-host regex list, then
//! rewrites any URL matching a supported host into its unlocked
//! direct-download link. Any failure along the way — bad credentials,
//! non-premium account, a host-side unlock error — degrades to passing the
//! original URL through unchanged plus a warning; this preprocessor never
//! aborts a run.
//!
//! Grounded on `original_source/goxel/alldebrid.go`'s `AllDebridURLPreprocessor`:
//! same two-call init (`/user/login`, `/hosts/regexp`), same per-URL
//! domain-match-then-unlock loop, same error-code table.

use std::collections::HashMap;

use engine::status::{Message, MessageSender};
use engine::UrlPreprocessor;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

const DEFAULT_API_BASE: &str = "https://api.alldebrid.com";
const AGENT: &str = "goxel";

fn error_text(code: i32) -> &'static str {
    match code {
        1 => "invalid token",
        2 => "invalid user or password",
        3 => "geolock protection active, please login from the website",
        4 => "user is banned",
        5 => "please provide both username and password, or a valid token",
        30 => "this link is not supported",
        31 => "this link is not available on the file hoster website",
        32 => "host under maintenance or not available",
        33 => "free trial limit reached (7 days / 25GB, or host ineligible for free trial)",
        34 => "too many concurrent downloads",
        35 => "all servers are full for this host, please retry later",
        36 => "download limit reached for this host",
        37 => "premium required to process this link",
        38 => "link is password protected",
        39 => "generic unlocking error",
        _ => "unknown error",
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    token: String,
    #[serde(default)]
    user: Option<AllDebridUser>,
    #[serde(rename = "errorCode", default)]
    error_code: i32,
}

#[derive(Debug, Deserialize)]
struct AllDebridUser {
    #[serde(rename = "isPremium")]
    premium: bool,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    success: bool,
    #[serde(default)]
    hosts: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LinkResponse {
    success: bool,
    #[serde(rename = "errorCode", default)]
    error_code: i32,
    #[serde(default)]
    infos: Option<LinkInfos>,
}

#[derive(Debug, Deserialize)]
struct LinkInfos {
    link: String,
}

struct Session {
    token: String,
    domains: Vec<Regex>,
}

enum State {
    Uninitialized,
    Disabled,
    Enabled(Session),
}

/// A [`UrlPreprocessor`] that unlocks supported host links through AllDebrid.
/// Initialization (login + host list) happens lazily on first `process`
/// call and at most once; a failed or non-premium login permanently
/// disables the preprocessor for the rest of the run (matching the
/// original's `Initialized`/`UseMe` flags).
pub struct AllDebridPreprocessor {
    client: Client,
    api_base: String,
    username: String,
    password: String,
    state: Mutex<State>,
}

impl AllDebridPreprocessor {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, username, password)
    }

    fn with_api_base(api_base: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            username: username.into(),
            password: password.into(),
            state: Mutex::new(State::Uninitialized),
        }
    }

    async fn login(&self, messages: &MessageSender) -> Option<Session> {
        let response = match self
            .client
            .get(format!("{}/user/login", self.api_base))
            .query(&[("agent", AGENT), ("username", &self.username), ("password", &self.password)])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let _ = messages
                    .send(Message::warning("alldebrid", format!("login request failed: {e}")))
                    .await;
                return None;
            }
        };

        let login: LoginResponse = match response.json().await {
            Ok(l) => l,
            Err(e) => {
                let _ = messages
                    .send(Message::warning("alldebrid", format!("malformed login response: {e}")))
                    .await;
                return None;
            }
        };

        if !login.success {
            let _ = messages
                .send(Message::warning(
                    "alldebrid",
                    format!("login failed: {}", error_text(login.error_code)),
                ))
                .await;
            return None;
        }

        let Some(user) = login.user else {
            return None;
        };

        if !user.premium {
            let _ = messages
                .send(Message::warning(
                    "alldebrid",
                    "non-premium accounts are not supported, bypassing",
                ))
                .await;
            return None;
        }

        let _ = messages
            .send(Message::info("alldebrid", format!("logged in as {}", user.username)))
            .await;

        let domains_response = match self
            .client
            .get(format!("{}/hosts/regexp", self.api_base))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let _ = messages
                    .send(Message::warning("alldebrid", format!("could not fetch host list: {e}")))
                    .await;
                return None;
            }
        };

        let domains: DomainsResponse = match domains_response.json().await {
            Ok(d) => d,
            Err(e) => {
                let _ = messages
                    .send(Message::warning("alldebrid", format!("malformed host list: {e}")))
                    .await;
                return None;
            }
        };

        if !domains.success {
            return None;
        }

        let patterns = domains
            .hosts
            .values()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Some(Session {
            token: login.token,
            domains: patterns,
        })
    }

    async fn unlock(&self, session: &Session, url: &str, messages: &MessageSender) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/link/unlock", self.api_base))
            .query(&[("agent", AGENT), ("token", session.token.as_str()), ("link", url)])
            .send()
            .await
            .ok()?;

        let parsed: LinkResponse = response.json().await.ok()?;

        if !parsed.success {
            let _ = messages
                .send(Message::warning(
                    "alldebrid",
                    format!("ignoring [{url}] due to an error: {}", error_text(parsed.error_code)),
                ))
                .await;
            return None;
        }

        parsed.infos.map(|i| i.link)
    }
}

#[async_trait::async_trait]
impl UrlPreprocessor for AllDebridPreprocessor {
    async fn process(&self, urls: Vec<String>, messages: &MessageSender) -> Vec<String> {
        let mut state = self.state.lock().await;

        if matches!(*state, State::Uninitialized) {
            *state = match self.login(messages).await {
                Some(session) => State::Enabled(session),
                None => State::Disabled,
            };
        }

        let session = match &*state {
            State::Enabled(session) => session,
            State::Disabled | State::Uninitialized => return urls,
        };

        let mut output = Vec::with_capacity(urls.len());
        for url in urls {
            let matched = session.domains.iter().any(|re| re.is_match(&url));

            if !matched {
                let _ = messages
                    .send(Message::info(
                        "alldebrid",
                        format!("no host matches [{url}], leaving it unchanged"),
                    ))
                    .await;
                output.push(url);
                continue;
            }

            match self.unlock(session, &url, messages).await {
                Some(direct) => output.push(direct),
                None => continue,
            }
        }
        output
    }
}
