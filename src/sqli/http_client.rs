// src/sqli/http_client.rs
use crate::sqli::config::ScanConfig;
use crate::sqli::error::ScanError;
use crate::sqli::types::*;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sends baseline and injected requests over one pooled client.
///
/// Reusing the connection keeps TCP/TLS setup out of the timing measurements.
pub struct HttpClient {
    client: Client,
    config: Arc<ScanConfig>,
    target: Arc<ScanTarget>,
}

impl HttpClient {
    pub fn new(config: Arc<ScanConfig>, target: Arc<ScanTarget>) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self {
            client,
            config,
            target,
        })
    }

    /// The unmodified request
    pub async fn baseline(&self) -> ProbeResult {
        self.send(
            self.target.method,
            &self.target.query,
            self.target.body.as_ref(),
            &self.target.cookies,
        )
        .await
    }

    /// Appends `payload` to the original value of `parameter` and sends the request.
    /// Body parameters always travel in a POST, whatever the configured method.
    pub async fn probe(&self, parameter: &Parameter, payload: &str) -> ProbeResult {
        let injected = format!("{}{}", parameter.original_value, payload);
        debug!(parameter = %parameter.name, kind = %parameter.kind, payload, "probe");

        match parameter.kind {
            ParameterKind::Query => {
                let query = replace_pair(&self.target.query, &parameter.name, &injected);
                self.send(
                    self.target.method,
                    &query,
                    self.target.body.as_ref(),
                    &self.target.cookies,
                )
                .await
            }
            ParameterKind::Body => {
                let mut body = self.target.body.clone().unwrap_or_default();
                body.insert(parameter.name.clone(), Value::String(injected));
                self.send(HttpMethod::POST, &self.target.query, Some(&body), &self.target.cookies)
                    .await
            }
            ParameterKind::Cookie => {
                let cookies = replace_pair(&self.target.cookies, &parameter.name, &injected);
                self.send(
                    self.target.method,
                    &self.target.query,
                    self.target.body.as_ref(),
                    &cookies,
                )
                .await
            }
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        query: &[(String, String)],
        body: Option<&serde_json::Map<String, Value>>,
        cookies: &[(String, String)],
    ) -> ProbeResult {
        let mut request = match method {
            HttpMethod::GET => self.client.get(&self.target.base_url),
            HttpMethod::POST => self.client.post(&self.target.base_url),
        };

        if !query.is_empty() {
            request = request.query(query);
        }

        if method == HttpMethod::POST {
            if let Some(body) = body {
                request = request.json(body);
            }
        }

        for (key, value) in &self.target.headers {
            request = request.header(key, value);
        }

        if !cookies.is_empty() {
            request = request.header(COOKIE, cookie_header(cookies));
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => return self.failure(e, start),
        };

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        match response.text().await {
            Ok(body) => ProbeResult {
                outcome: ProbeOutcome::Response(ProbeResponse {
                    status,
                    body,
                    headers,
                }),
                elapsed: start.elapsed().as_secs_f64(),
            },
            Err(e) => self.failure(e, start),
        }
    }

    fn failure(&self, error: reqwest::Error, start: Instant) -> ProbeResult {
        if error.is_timeout() {
            ProbeResult {
                outcome: ProbeOutcome::Unreachable(ProbeFailure::Timeout),
                elapsed: self.config.timeout_secs as f64,
            }
        } else {
            ProbeResult {
                outcome: ProbeOutcome::Unreachable(ProbeFailure::Connection(error.to_string())),
                elapsed: start.elapsed().as_secs_f64(),
            }
        }
    }
}

fn replace_pair(pairs: &[(String, String)], name: &str, value: &str) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            if k == name {
                (k.clone(), value.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Values are percent-encoded so `;` and spaces inside a payload stay in one cookie
fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(url: &str, tweak: impl FnOnce(&mut ScanConfig)) -> HttpClient {
        let mut config = ScanConfig {
            url: url.to_string(),
            ..ScanConfig::default()
        };
        tweak(&mut config);
        let target = config.target().unwrap();
        HttpClient::new(Arc::new(config), Arc::new(target)).unwrap()
    }

    fn param(name: &str, kind: ParameterKind, value: &str) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind,
            original_value: value.to_string(),
        }
    }

    #[test]
    fn test_cookie_header_format() {
        let cookies = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        assert_eq!(cookie_header(&cookies), "a=1; b=2");
    }

    #[test]
    fn test_cookie_header_keeps_payload_in_one_cookie() {
        let cookies = vec![
            ("session".to_string(), "abc'; WAITFOR DELAY '0:0:3'--".to_string()),
            ("theme".to_string(), "dark".to_string()),
        ];
        let header = cookie_header(&cookies);
        assert_eq!(header.matches("; ").count(), 1);
        assert!(header.starts_with("session=abc%27%3B%20WAITFOR"));
        assert!(header.ends_with("; theme=dark"));
    }

    #[test]
    fn test_http_client_creation() {
        let config = ScanConfig {
            url: "https://example.com/?id=1".to_string(),
            ..ScanConfig::default()
        };
        let target = config.target().unwrap();
        assert!(HttpClient::new(Arc::new(config), Arc::new(target)).is_ok());
    }

    #[tokio::test]
    async fn test_query_probe_appends_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "1' OR 1=1--"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("injected"))
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/item?id=1&page=2", server.uri()), |_| {});
        let result = client
            .probe(&param("id", ParameterKind::Query, "1"), "' OR 1=1--")
            .await;

        let resp = result.response().expect("mock should answer");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "injected");
    }

    #[tokio::test]
    async fn test_body_probe_keeps_other_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({"name": "test'", "limit": 5})))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/api/products", server.uri()), |c| {
            c.method = HttpMethod::POST;
            c.data = Some(
                serde_json::json!({"name": "test", "limit": 5})
                    .as_object()
                    .cloned()
                    .unwrap(),
            );
        });
        let result = client
            .probe(&param("name", ParameterKind::Body, "test"), "'")
            .await;
        assert_eq!(result.response().map(|r| r.status), Some(201));
    }

    #[tokio::test]
    async fn test_body_probe_posts_even_for_get_scans() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({"name": "widget'"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("posted"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain get"))
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/api", server.uri()), |c| {
            c.data = serde_json::json!({"name": "widget"}).as_object().cloned();
        });

        let baseline = client.baseline().await;
        assert_eq!(baseline.response().map(|r| r.body.as_str()), Some("plain get"));

        let result = client
            .probe(&param("name", ParameterKind::Body, "widget"), "'")
            .await;
        assert_eq!(result.response().map(|r| r.body.as_str()), Some("posted"));
    }

    #[tokio::test]
    async fn test_non_ascii_header_value_survives() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("x-protected-by", "Sucuri Cloudproxy ü".as_bytes()),
            )
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/?id=1", server.uri()), |_| {});
        let result = client.baseline().await;
        let value = result
            .response()
            .and_then(|r| r.headers.get("x-protected-by").cloned())
            .unwrap_or_default();
        assert!(value.starts_with("Sucuri Cloudproxy"));
    }

    #[tokio::test]
    async fn test_cookie_probe_rewrites_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cookie", "session=abc%27; theme=dark"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cookie hit"))
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/", server.uri()), |c| {
            c.cookies = vec![
                ("session".to_string(), "abc".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ];
        });
        let result = client
            .probe(&param("session", ParameterKind::Cookie, "abc"), "'")
            .await;
        assert_eq!(result.response().map(|r| r.body.as_str()), Some("cookie hit"));
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/?id=1", server.uri()), |c| c.timeout_secs = 1);
        let result = client.baseline().await;
        assert!(matches!(
            result.outcome,
            ProbeOutcome::Unreachable(ProbeFailure::Timeout)
        ));
        assert_eq!(result.elapsed, 1.0);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let client = client_for("http://127.0.0.1:1/?id=1", |_| {});
        let result = client.baseline().await;
        assert!(matches!(
            result.outcome,
            ProbeOutcome::Unreachable(ProbeFailure::Connection(_))
        ));
    }
}
