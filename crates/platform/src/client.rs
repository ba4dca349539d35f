use regex::Regex;
use reqwest::Client;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid proxy URL [{0}]")]
    InvalidProxy(String),
    #[error("unsupported proxy protocol in [{0}], expected http, https or socks5")]
    UnsupportedProtocol(String),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Builds an HTTP client honoring an optional proxy and the global
/// TLS-verification flag.
///
/// `proxy` must be of the form `(http|https|socks5)://host:port` when
/// present; any other shape is a fatal configuration error (spec §4.7).
pub fn build_client(proxy: Option<&str>, insecure: bool) -> Result<Client, ClientError> {
    let mut builder = Client::builder().danger_accept_invalid_certs(insecure);

    if let Some(proxy_url) = proxy {
        let protocol_re = Regex::new(r"^(http|https|socks5)://").expect("static regex");
        if !protocol_re.is_match(proxy_url) {
            return Err(ClientError::UnsupportedProtocol(proxy_url.to_string()));
        }

        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|_| ClientError::InvalidProxy(proxy_url.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(ClientError::Build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_plain_client() {
        assert!(build_client(None, false).is_ok());
    }

    #[test]
    fn accepts_http_proxy() {
        assert!(build_client(Some("http://127.0.0.1:8123"), false).is_ok());
    }

    #[test]
    fn accepts_https_proxy() {
        assert!(build_client(Some("https://127.0.0.1:8123"), false).is_ok());
    }

    #[test]
    fn accepts_socks5_proxy() {
        assert!(build_client(Some("socks5://127.0.0.1:1080"), false).is_ok());
    }

    #[test]
    fn rejects_unsupported_protocol() {
        let err = build_client(Some("ftp://127.0.0.1:21"), false).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedProtocol(_)));
    }

    #[test]
    fn rejects_garbage_proxy_string() {
        let err = build_client(Some("not-a-url"), false).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedProtocol(_)));
    }
}
