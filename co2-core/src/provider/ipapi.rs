use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{error::LocationError, model::Location};

use super::GeoProvider;

pub const DEFAULT_BASE_URL: &str = "https://ipapi.co";

/// IP geolocation via ipapi.co. The key is optional; without one the free
/// tier is used.
#[derive(Debug, Clone)]
pub struct IpApiProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl IpApiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/json/", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    country_name: Option<String>,
    country_code: Option<String>,
    country_code_iso3: Option<String>,
    city: Option<String>,
    region: Option<String>,
}

impl From<IpApiResponse> for Location {
    fn from(res: IpApiResponse) -> Self {
        Location {
            country: res.country_name,
            country_code: res.country_code,
            country_code_iso3: res.country_code_iso3,
            city: res.city,
            region: res.region,
        }
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    async fn locate(&self) -> Result<Location, LocationError> {
        let mut req = self.http.get(self.endpoint());
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(LocationError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: IpApiResponse = serde_json::from_str(&body)?;

        if parsed.error {
            return Err(LocationError::Rejected {
                reason: parsed.reason.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        Ok(parsed.into())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paris() -> serde_json::Value {
        serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Paris",
            "region": "Île-de-France",
            "country_name": "France",
            "country_code": "FR",
            "country_code_iso3": "FRA",
            "latitude": 48.8566
        })
    }

    #[tokio::test]
    async fn parses_location_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .and(query_param_is_missing("key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(paris()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::new(None).with_base_url(mock_server.uri());
        let location = provider.locate().await.expect("location");

        assert_eq!(location.country.as_deref(), Some("France"));
        assert_eq!(location.country_code.as_deref(), Some("FR"));
        assert_eq!(location.country_code_iso3.as_deref(), Some("FRA"));
        assert_eq!(location.city.as_deref(), Some("Paris"));
        assert_eq!(location.region.as_deref(), Some("Île-de-France"));
    }

    #[tokio::test]
    async fn sends_configured_key_as_query_parameter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .and(query_param("key", "SECRET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(paris()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider =
            IpApiProvider::new(Some("SECRET".into())).with_base_url(format!("{}/", mock_server.uri()));
        assert!(provider.locate().await.is_ok());
    }

    #[tokio::test]
    async fn missing_fields_become_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "country_name": "Antarctica"
            })))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::new(None).with_base_url(mock_server.uri());
        let location = provider.locate().await.expect("location");

        assert_eq!(location.country.as_deref(), Some("Antarctica"));
        assert!(location.country_code_iso3.is_none());
        assert!(location.city.is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::new(None).with_base_url(mock_server.uri());
        let err = provider.locate().await.unwrap_err();

        assert!(matches!(err, LocationError::Parse(_)));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::new(None).with_base_url(mock_server.uri());
        let err = provider.locate().await.unwrap_err();

        match err {
            LocationError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "Too many requests");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_error_flag_is_rejection() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": true,
                "reason": "RateLimited"
            })))
            .mount(&mock_server)
            .await;

        let provider = IpApiProvider::new(None).with_base_url(mock_server.uri());
        let err = provider.locate().await.unwrap_err();

        assert!(matches!(err, LocationError::Rejected { ref reason } if reason == "RateLimited"));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Nothing listens on the discard port.
        let provider = IpApiProvider::new(None).with_base_url("http://127.0.0.1:9");
        let err = provider.locate().await.unwrap_err();

        assert!(matches!(err, LocationError::Network(_)));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
    }
}
