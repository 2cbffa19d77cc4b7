use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Fully resolved outbound HTTP request built by the `api-call` node (all
/// fields already substituted).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub auth: Option<ResolvedAuth>,
}

#[derive(Debug, Clone)]
pub enum ResolvedAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

/// Generic outbound HTTP capability consumed by the `api-call` node. No
/// retries or timeouts here; those belong to the implementation.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default reqwest-backed implementation.
#[derive(Default, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpCapability for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        match request.auth {
            Some(ResolvedAuth::Bearer(token)) => builder = builder.bearer_auth(token),
            Some(ResolvedAuth::Basic { username, password }) => {
                builder = builder.basic_auth(username, Some(password));
            }
            None => {}
        }
        if let Some(body) = request.body {
            // Structured bodies go out as JSON, anything else as raw text.
            builder = match serde_json::from_str::<Value>(&body) {
                Ok(json) => builder.json(&json),
                Err(_) => builder.body(body),
            };
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Request to {} failed", request.url))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(HttpResponse { status, body })
    }
}
