//! Shared reqwest plumbing for the service adapters.

use std::time::Duration;

use reqwest::{Client, Response};

/// Builds a client with a request timeout. The pipeline bounds every call
/// again on its side; this one only guards the socket.
pub fn client(timeout_ms: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

pub fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Passes a 2xx response through; anything else becomes `"<status>: <body>"`.
pub async fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("{status}: {}", truncate(&body, 200)))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base() {
        assert_eq!(trim_base("https://api.brevo.com/v3/"), "https://api.brevo.com/v3");
        assert_eq!(trim_base("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("ééé", 2), "éé");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
