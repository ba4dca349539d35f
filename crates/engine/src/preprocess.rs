//! URL preprocessor chain (spec §4.6): a flat list of transformers applied
//! in order before planning. The standard preprocessor below trims and
//! filters; the third-party AllDebrid unlocker lives in the `api` crate so
//! its dependency footprint stays out of the core engine (SPEC_FULL §4.6).

use async_trait::async_trait;
use regex::Regex;

use crate::status::{Message, MessageSender};

/// A pluggable URL-list transformer (spec §4.6: `process(urls) -> urls`).
#[async_trait]
pub trait UrlPreprocessor: Send + Sync {
    async fn process(&self, urls: Vec<String>, messages: &MessageSender) -> Vec<String>;
}

/// Trims whitespace and drops blank or non-URL-shaped lines, matching
/// `original_source/goxel/url.go`'s `StandardURLPreprocessor` byte for byte
/// in behavior (it does not reproduce the stray `&amp;` HTML-entity artifact
/// in that file's regex literal, which only ever matched literal `&amp;`
/// text and never an actual `&` in a query string).
pub struct StandardUrlPreprocessor {
    re: Regex,
}

impl StandardUrlPreprocessor {
    pub fn new() -> Self {
        Self {
            re: Regex::new(
                r"(http|ftp|https)://([\w\-]+(?:\.[\w\-]+)+)([\w\-.,@?^=%&:/~+#]*[\w\-@?^=%&/~+#])?",
            )
            .expect("static regex"),
        }
    }
}

impl Default for StandardUrlPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlPreprocessor for StandardUrlPreprocessor {
    async fn process(&self, urls: Vec<String>, messages: &MessageSender) -> Vec<String> {
        let mut output = Vec::with_capacity(urls.len());

        for raw in urls {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            if !self.re.is_match(trimmed) {
                let _ = messages
                    .send(Message::info(
                        "url-preprocessor",
                        format!("removing non-URL line [{trimmed}]"),
                    ))
                    .await;
                continue;
            }

            output.push(trimmed.to_string());
        }

        output
    }
}

/// Runs every preprocessor in `chain` over `urls`, in order (spec §4.6).
pub async fn run_chain(
    chain: &[Box<dyn UrlPreprocessor>],
    mut urls: Vec<String>,
    messages: &MessageSender,
) -> Vec<String> {
    for preprocessor in chain {
        urls = preprocessor.process(urls, messages).await;
    }
    urls
}
