//! HTTP adapter for the inventory resolver.

use std::time::Duration;

use {
    async_trait::async_trait,
    partdesk_config::ResolverConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    bridge::{CodeResolver, ResolveRequest},
    error::{Context, Error, Result},
};

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    replies: Option<Vec<String>>,
}

/// POSTs a [`ResolveRequest`] as JSON and reads `{"replies": [...]}` back.
pub struct HttpResolver {
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret<String>>,
}

impl HttpResolver {
    /// `timeout` bounds each request, connect included.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for the resolver")?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }

    /// `Ok(None)` when no endpoint is configured.
    pub fn from_config(cfg: &ResolverConfig, timeout: Duration) -> Result<Option<Self>> {
        let Some(url) = cfg.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        Self::new(url, cfg.api_key.clone(), timeout).map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CodeResolver for HttpResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Option<Vec<String>>> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::ResolverStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        debug!(status = status.as_u16(), bytes = body.len(), "resolver response");
        let parsed: Option<ResolveResponse> =
            serde_json::from_str(&body).context("resolver response is not valid JSON")?;
        Ok(parsed.and_then(|r| r.replies))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use {
        axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post},
        serde_json::{Value, json},
    };

    async fn start_mock(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/resolve")
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn request() -> ResolveRequest {
        ResolveRequest {
            codes: vec!["1234567890".into(), "58101-2SA00".into()],
            title: "Ali".into(),
            delivery_text: "today".into(),
        }
    }

    #[tokio::test]
    async fn posts_request_and_reads_replies() {
        let app = Router::new().route(
            "/resolve",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer k-123"
                );
                let codes = body["codes"].as_array().unwrap().len();
                assert_eq!(body["delivery_text"], "today");
                Json(json!({ "replies": vec![format!("{codes} codes"); 1] }))
            }),
        );
        let url = start_mock(app).await;
        let resolver = HttpResolver::new(url, Some(Secret::new("k-123".into())), TIMEOUT).unwrap();
        let replies = resolver.resolve(&request()).await.unwrap();
        assert_eq!(replies, Some(vec!["2 codes".to_string()]));
    }

    #[tokio::test]
    async fn null_body_means_no_replies() {
        let app = Router::new().route("/resolve", post(|| async { Json(Value::Null) }));
        let resolver = HttpResolver::new(start_mock(app).await, None, TIMEOUT).unwrap();
        assert_eq!(resolver.resolve(&request()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let app = Router::new().route("/resolve", post(|| async { "<html>oops</html>" }));
        let resolver = HttpResolver::new(start_mock(app).await, None, TIMEOUT).unwrap();
        let err = resolver.resolve(&request()).await.unwrap_err();
        assert!(err.to_string().starts_with("resolver response is not valid JSON"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let app = Router::new().route(
            "/resolve",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "db down") }),
        );
        let resolver = HttpResolver::new(start_mock(app).await, None, TIMEOUT).unwrap();
        let err = resolver.resolve(&request()).await.unwrap_err();
        assert!(matches!(err, Error::ResolverStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let app = Router::new().route(
            "/resolve",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(Value::Null)
            }),
        );
        let resolver =
            HttpResolver::new(start_mock(app).await, None, Duration::from_millis(200)).unwrap();
        let err = resolver.resolve(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Http(e) if e.is_timeout()));
    }

    #[test]
    fn from_config_requires_url() {
        assert!(
            HttpResolver::from_config(&ResolverConfig::default(), TIMEOUT)
                .unwrap()
                .is_none()
        );
        let cfg = ResolverConfig {
            url: Some("http://127.0.0.1:9/resolve".into()),
            api_key: None,
        };
        assert_eq!(
            HttpResolver::from_config(&cfg, TIMEOUT).unwrap().unwrap().url(),
            "http://127.0.0.1:9/resolve"
        );
    }
}
