use std::sync::OnceLock;

static BASE_URL: OnceLock<String> = OnceLock::new();

/// API base URL, resolved once and never re-read mid-session. A compile-time
/// `API_BASE_URL` override wins; otherwise development builds talk to a local
/// backend directly while release builds use a relative path behind the same
/// origin.
pub fn base_url() -> &'static str {
    BASE_URL.get_or_init(|| match option_env!("API_BASE_URL") {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if cfg!(debug_assertions) => "http://localhost:8000/api/v1".to_string(),
        None => "/api/v1".to_string(),
    })
}

pub fn api_url(endpoint: &str) -> String {
    format!("{}/{}", base_url(), endpoint.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_without_double_slash() {
        let url = api_url("/device");
        assert!(url.ends_with("/device"));
        assert!(!url.contains("//device"));
    }
}
