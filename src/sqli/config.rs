// src/sqli/config.rs
use crate::sqli::error::ScanError;
use crate::sqli::types::{HttpMethod, ScanTarget};
use serde_json::{Map, Value};
use tracing::warn;

pub const MAX_THREADS: usize = 20;

/// Configuration for the SQL injection scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub url: String,
    pub method: HttpMethod,
    /// POST body fields, sent as JSON
    pub data: Option<Map<String, Value>>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub timeout_secs: u64,
    /// Sleep duration injected by time-based payloads
    pub delay_secs: u64,
    /// Accepted and validated; probing stays sequential
    pub threads: usize,
    pub deep_scan: bool,
    pub detect_waf: bool,
    pub follow_redirects: bool,
    pub verify_tls: bool,
    pub user_agent: String,
    /// Pause between consecutive payloads of a technique
    pub payload_delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::GET,
            data: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            timeout_secs: 10,
            delay_secs: 3,
            threads: 5,
            deep_scan: false,
            detect_waf: true,
            follow_redirects: true,
            verify_tls: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            payload_delay_ms: 0,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| ScanError::Config(format!("Invalid target URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScanError::Config(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ScanError::Config("Timeout must be at least 1 second".to_string()));
        }

        if self.delay_secs == 0 {
            return Err(ScanError::Config("Delay must be at least 1 second".to_string()));
        }

        if self.delay_secs >= self.timeout_secs {
            return Err(ScanError::Config(format!(
                "Delay ({}s) must be shorter than the request timeout ({}s)",
                self.delay_secs, self.timeout_secs
            )));
        }

        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ScanError::Config(format!(
                "Threads must be between 1 and {}",
                MAX_THREADS
            )));
        }

        if self.method == HttpMethod::POST && self.data.is_none() && url.query().is_none() {
            warn!("POST scan without --data or query parameters: only cookies can be tested");
        }

        Ok(())
    }

    /// Splits the URL into base and ordered query pairs
    pub fn target(&self) -> Result<ScanTarget, ScanError> {
        let url = url::Url::parse(&self.url)?;
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);

        Ok(ScanTarget {
            base_url: base.to_string(),
            method: self.method,
            query,
            body: self.data.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
        })
    }
}

/// `Name: value` entries; anything without a colon is skipped
pub fn parse_headers(raw: &[String]) -> Vec<(String, String)> {
    raw.iter()
        .filter_map(|h| h.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// `key=value; key2=value2`
pub fn parse_cookies(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// POST data must be a JSON object
pub fn parse_post_data(raw: &str) -> Result<Map<String, Value>, ScanError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ScanError::Config("POST data must be a JSON object".to_string())),
        Err(e) => Err(ScanError::Config(format!("Invalid JSON data: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ScanConfig {
        ScanConfig {
            url: url.to_string(),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let c = ScanConfig::default();
        assert_eq!(c.timeout_secs, 10);
        assert_eq!(c.delay_secs, 3);
        assert_eq!(c.threads, 5);
        assert!(!c.deep_scan);
        assert!(c.detect_waf);
    }

    #[test]
    fn test_validate_accepts_plain_target() {
        assert!(config("http://localhost:3001/api/products?name=test").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(config("not a url").validate().is_err());
        assert!(config("ftp://example.com/").validate().is_err());

        let mut c = config("http://example.com/?id=1");
        c.delay_secs = 10;
        assert!(matches!(c.validate(), Err(ScanError::Config(_))));

        let mut c = config("http://example.com/?id=1");
        c.threads = 50;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_target_splits_query() {
        let target = config("http://example.com/search?q=test&page=2#top").target().unwrap();
        assert_eq!(target.base_url, "http://example.com/search");
        assert_eq!(
            target.query,
            vec![
                ("q".to_string(), "test".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&[
            "X-API-Key: test".to_string(),
            "Authorization: Bearer a:b".to_string(),
            "garbage".to_string(),
        ]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1], ("Authorization".to_string(), "Bearer a:b".to_string()));
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("session=abc123; theme=dark ;broken");
        assert_eq!(
            cookies,
            vec![
                ("session".to_string(), "abc123".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_post_data() {
        let data = parse_post_data(r#"{"username":"admin","age":3}"#).unwrap();
        assert_eq!(data.len(), 2);
        assert!(matches!(parse_post_data("{broken"), Err(ScanError::Config(_))));
        assert!(matches!(parse_post_data("[1,2]"), Err(ScanError::Config(_))));
    }
}
