//! Request pipeline: one authenticated physical call per attempt
//!
//! [`Transport::call`] injects the identity parameters, signs the request, maps
//! error statuses onto [`OrnithoError`] variants, re-attempts on the caller's retry
//! budget and decodes the body according to its declared content type.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, TRANSFER_ENCODING};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::CachedBackend;
use crate::codec::Params;
use crate::config::Config;
use crate::error::{HttpFailure, OrnithoError, Result};
use crate::oauth::OAuthSigner;

/// Replaces credential values in logged and reported query strings
pub const REDACTED: &str = "***";

/// Response header carrying the continuation token
pub const PAGINATION_HEADER: &str = "pagination_key";

/// First line the service prepends to some mutation responses, which breaks the JSON
pub const SUCCESS_BANNERS: &[&str] = &[
    "API message : Ihre Beobachtungsdaten wurden erfolgreich übermittelt, vielen Dank!",
];

const CREDENTIAL_PARAMS: &[&str] = &["user_email", "user_pw"];

/// A logical API request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path relative to the API base, e.g. `observations/search`
    pub path: String,
    pub pagination_key: Option<String>,
    pub short_version: bool,
    /// Continue through every page (honoured by the envelope layer)
    pub request_all: bool,
    pub params: Params,
    pub body: Option<Params>,
    /// Extra attempts on a non-2xx status
    pub retries: u32,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            pagination_key: None,
            short_version: false,
            request_all: false,
            params: Params::new(),
            body: None,
            retries: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn pagination_key(mut self, key: Option<String>) -> Self {
        self.pagination_key = key;
        self
    }

    pub fn short_version(mut self, short_version: bool) -> Self {
        self.short_version = short_version;
        self
    }

    pub fn request_all(mut self, request_all: bool) -> Self {
        self.request_all = request_all;
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn body(mut self, body: Params) -> Self {
        self.body = Some(body);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Pdf(Vec<u8>),
    Text(String),
}

/// A fully prepared physical request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without the query string
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Absolute URL including the encoded query string
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        format!("{}?{}", self.url, encode_query(&self.query))
    }

    /// Value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw physical response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    fn header(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one physical HTTP exchange
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpBackend + ?Sized> HttpBackend for Arc<T> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request).await
    }
}

/// reqwest session signing every request with OAuth1
pub struct OAuthSession {
    http: reqwest::Client,
    signer: OAuthSigner,
}

impl OAuthSession {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(&config.consumer_key, &config.consumer_secret),
        })
    }
}

#[async_trait]
impl HttpBackend for OAuthSession {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let authorization = self
            .signer
            .authorization(request.method.as_str(), &request.url, &request.query);

        let mut builder = self
            .http
            .request(request.method.clone(), request.full_url())
            .header(AUTHORIZATION, authorization);
        if let Some(ref body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Authenticated request pipeline for one configuration
pub struct Transport {
    config: Config,
    backend: OnceLock<Arc<dyn HttpBackend>>,
}

impl Transport {
    /// The OAuth session is built on the first call
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backend: OnceLock::new(),
        }
    }

    /// Use a custom backend instead of the OAuth session
    pub fn with_backend(config: Config, backend: Arc<dyn HttpBackend>) -> Self {
        let transport = Self::new(config);
        let _ = transport.backend.set(backend);
        transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn backend(&self) -> Result<&Arc<dyn HttpBackend>> {
        if let Some(backend) = self.backend.get() {
            return Ok(backend);
        }

        let session: Arc<dyn HttpBackend> = match self.config.cache_ttl {
            Some(ttl) => Arc::new(CachedBackend::new(OAuthSession::new(&self.config)?, ttl)),
            None => Arc::new(OAuthSession::new(&self.config)?),
        };
        Ok(self.backend.get_or_init(|| session))
    }

    /// Perform the request and decode its body
    ///
    /// Returns the payload and the continuation token, if the response carried a
    /// meaningful one.
    pub async fn call(&self, request: &Request) -> Result<(Payload, Option<String>)> {
        let http_request = self.prepare(request);
        let backend = self.backend()?;
        let mut retries_left = request.retries;

        loop {
            info!(
                method = %request.method,
                path = %request.path,
                query = %redact_query(&http_request.query),
                short_version = request.short_version,
                "Request to ornitho API"
            );

            let response = backend.execute(&http_request).await?;
            if response.status.is_success() {
                return decode(request, &response);
            }

            if retries_left > 0 {
                retries_left -= 1;
                warn!(
                    status = response.status.as_u16(),
                    path = %request.path,
                    retries_left,
                    "Retrying failed request"
                );
                continue;
            }

            return Err(classify(request, &http_request, &response));
        }
    }

    /// Resolve URL, query and body for a logical request
    pub fn prepare(&self, request: &Request) -> HttpRequest {
        let mut query = vec![
            ("user_email".to_string(), self.config.user_email.clone()),
            ("user_pw".to_string(), self.config.user_pw.clone()),
        ];
        if let Some(ref key) = request.pagination_key {
            query.push(("pagination_key".to_string(), key.clone()));
        }
        if request.short_version {
            query.push(("short_version".to_string(), "1".to_string()));
        }

        for (name, value) in request.params.to_query() {
            if query.iter().any(|(injected, _)| *injected == name) {
                debug!(param = %name, "Ignoring caller parameter shadowing an injected one");
                continue;
            }
            query.push((name, value));
        }

        HttpRequest {
            method: request.method.clone(),
            url: format!("{}{}", self.config.api_base, request.path),
            query,
            body: request.body.as_ref().map(|body| body.to_json().to_string()),
        }
    }
}

fn decode(request: &Request, response: &HttpResponse) -> Result<(Payload, Option<String>)> {
    let pagination_key = pagination_key(response);

    if request.method == Method::DELETE {
        return Ok((Payload::Text(response.text()), pagination_key));
    }

    let content_type = response.header(CONTENT_TYPE).map(|ct| ct.to_ascii_lowercase());
    let payload = match content_type.as_deref() {
        Some(ct) if ct.starts_with("application/json") => Payload::Json(parse_json(&response.text())?),
        Some(ct) if ct.starts_with("application/pdf") => Payload::Pdf(response.body.clone()),
        Some(ct) if ct.starts_with("text/html") => Payload::Text(response.text()),
        _ => {
            return Err(OrnithoError::ContentType {
                path: request.path.clone(),
                content_type: response.header(CONTENT_TYPE).map(str::to_string),
            })
        }
    };

    Ok((payload, pagination_key))
}

/// Token is only meaningful on chunked responses
fn pagination_key(response: &HttpResponse) -> Option<String> {
    let chunked = response
        .header(TRANSFER_ENCODING)
        .map(|te| te.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    if !chunked {
        return None;
    }

    response
        .header(PAGINATION_HEADER)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Parse a JSON body, dropping a success banner line and treating blank bodies as `{}`
pub fn parse_json(text: &str) -> Result<Value> {
    let mut body = text;
    if let Some((first, rest)) = text.split_once('\n') {
        if SUCCESS_BANNERS.contains(&first.trim_end_matches('\r').trim()) {
            body = rest;
        }
    } else if SUCCESS_BANNERS.contains(&text.trim()) {
        body = "";
    }

    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(body)?)
}

fn classify(request: &Request, http_request: &HttpRequest, response: &HttpResponse) -> OrnithoError {
    let failure = HttpFailure {
        status: response.status.as_u16(),
        reason: response
            .status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string(),
        path: request.path.clone(),
        query: redact_query(&http_request.query),
        request_body: http_request.body.clone(),
        response_body: response.text(),
    };

    match response.status {
        StatusCode::UNAUTHORIZED => OrnithoError::Authentication(failure),
        StatusCode::BAD_GATEWAY => OrnithoError::BadGateway(failure),
        StatusCode::SERVICE_UNAVAILABLE => OrnithoError::ServiceUnavailable(failure),
        StatusCode::GATEWAY_TIMEOUT => OrnithoError::GatewayTimeout(failure),
        _ => OrnithoError::Http(failure),
    }
}

/// Encoded query string with credential values masked
pub fn redact_query(query: &[(String, String)]) -> String {
    let masked: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| {
            if CREDENTIAL_PARAMS.contains(&k.as_str()) {
                (k.clone(), REDACTED.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect();
    encode_query(&masked)
}

fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, json_response, response, ScriptedBackend};
    use serde_json::json;

    fn transport(backend: &Arc<ScriptedBackend>) -> Transport {
        Transport::with_backend(config(), backend.clone())
    }

    #[test]
    fn test_prepare_injects_identity_first() {
        let backend = ScriptedBackend::new(vec![]);
        let request = Request::get("observations")
            .pagination_key(Some("pk1".to_string()))
            .short_version(true)
            .params(Params::new().with("id_species", 1).with("user_pw", "stolen").with("only_form", true));

        let prepared = transport(&backend).prepare(&request);
        assert_eq!(prepared.url, "https://ornitho.test/api/observations");
        assert_eq!(
            prepared.query,
            vec![
                ("user_email".to_string(), "birder@example.org".to_string()),
                ("user_pw".to_string(), "pw".to_string()),
                ("pagination_key".to_string(), "pk1".to_string()),
                ("short_version".to_string(), "1".to_string()),
                ("id_species".to_string(), "1".to_string()),
                ("only_form".to_string(), "1".to_string()),
            ]
        );
        assert!(prepared.body.is_none());
    }

    #[test]
    fn test_full_url() {
        let backend = ScriptedBackend::new(vec![]);
        let prepared = transport(&backend).prepare(&Request::get("species/1"));
        assert_eq!(
            prepared.full_url(),
            "https://ornitho.test/api/species/1?user_email=birder%40example.org&user_pw=pw"
        );
    }

    #[test]
    fn test_redact_query() {
        let query = vec![
            ("user_email".to_string(), "birder@example.org".to_string()),
            ("user_pw".to_string(), "pw".to_string()),
            ("id".to_string(), "4".to_string()),
        ];
        assert_eq!(redact_query(&query), "user_email=%2A%2A%2A&user_pw=%2A%2A%2A&id=4");
    }

    #[test]
    fn test_parse_json_strips_banner() {
        let text = format!("{}\n{{\"id\": [\"5\"]}}", SUCCESS_BANNERS[0]);
        assert_eq!(parse_json(&text).unwrap(), json!({"id": ["5"]}));
    }

    #[test]
    fn test_parse_json_blank_is_empty_object() {
        assert_eq!(parse_json("  \n").unwrap(), json!({}));
        assert_eq!(parse_json(SUCCESS_BANNERS[0]).unwrap(), json!({}));
    }

    #[test]
    fn test_parse_json_error_is_decode() {
        let err = parse_json("API message : something else\n{}").unwrap_err();
        assert!(matches!(err, OrnithoError::Decode(_)));
    }

    #[tokio::test]
    async fn test_call_json_with_pagination() {
        let mut page = json_response(json!({"data": [{"id": "1"}]}));
        page.headers.insert("pagination_key", HeaderValue::from_static("next"));
        page.headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        let backend = ScriptedBackend::new(vec![page]);

        let (payload, key) = transport(&backend).call(&Request::get("species")).await.unwrap();
        assert_eq!(payload, Payload::Json(json!({"data": [{"id": "1"}]})));
        assert_eq!(key.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_pagination_header_without_chunking_is_ignored() {
        let mut page = json_response(json!([]));
        page.headers.insert("pagination_key", HeaderValue::from_static("next"));
        let backend = ScriptedBackend::new(vec![page]);

        let (_, key) = transport(&backend).call(&Request::get("species")).await.unwrap();
        assert!(key.is_none());
    }

    #[tokio::test]
    async fn test_content_type_dispatch() {
        let backend = ScriptedBackend::new(vec![
            response(200, Some("application/pdf"), b"%PDF-1.4".to_vec()),
            response(200, Some("text/html; charset=UTF-8"), b"<p>ok</p>".to_vec()),
        ]);
        let transport = transport(&backend);

        let (pdf, _) = transport.call(&Request::get("protocol/site_pdf")).await.unwrap();
        assert_eq!(pdf, Payload::Pdf(b"%PDF-1.4".to_vec()));
        let (html, _) = transport.call(&Request::get("places")).await.unwrap();
        assert_eq!(html, Payload::Text("<p>ok</p>".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_or_missing_content_type() {
        let backend = ScriptedBackend::new(vec![
            response(200, Some("image/png"), vec![]),
            response(200, None, vec![]),
        ]);
        let transport = transport(&backend);

        for _ in 0..2 {
            let err = transport.call(&Request::get("media/1")).await.unwrap_err();
            assert!(matches!(err, OrnithoError::ContentType { .. }));
        }
    }

    #[tokio::test]
    async fn test_delete_returns_raw_text() {
        let backend = ScriptedBackend::new(vec![response(200, Some("image/png"), b"deleted".to_vec())]);
        let (payload, _) = transport(&backend)
            .call(&Request::delete("observations/1"))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text("deleted".to_string()));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (401, "Authentication"),
            (502, "BadGateway"),
            (503, "ServiceUnavailable"),
            (504, "GatewayTimeout"),
            (404, "Http"),
        ];
        for (status, kind) in cases {
            let backend = ScriptedBackend::new(vec![response(status, Some("text/html"), vec![])]);
            let err = transport(&backend).call(&Request::get("species/1")).await.unwrap_err();
            assert!(format!("{:?}", err).starts_with(kind), "{} -> {:?}", status, err);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_http_error_carries_redacted_diagnostics() {
        let backend = ScriptedBackend::new(vec![response(400, Some("text/html"), b"bad".to_vec())]);
        let request = Request::post("observations/search").body(Params::new().with("id_form", 3));
        let err = transport(&backend).call(&request).await.unwrap_err();

        let failure = err.http_failure().unwrap();
        assert_eq!(failure.status, 400);
        assert_eq!(failure.reason, "Bad Request");
        assert_eq!(failure.path, "observations/search");
        assert_eq!(failure.query, "user_email=%2A%2A%2A&user_pw=%2A%2A%2A");
        assert_eq!(failure.request_body.as_deref(), Some("{\"id_form\":3}"));
        assert_eq!(failure.response_body, "bad");
    }

    #[tokio::test]
    async fn test_retry_exhaustion() {
        let backend = ScriptedBackend::repeating(response(503, Some("text/html"), vec![]));
        let err = transport(&backend)
            .call(&Request::get("observations").retries(2))
            .await
            .unwrap_err();

        assert!(matches!(err, OrnithoError::ServiceUnavailable(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let backend = ScriptedBackend::new(vec![
            response(401, Some("text/html"), vec![]),
            json_response(json!([{"id": "1"}])),
        ]);
        let (payload, _) = transport(&backend)
            .call(&Request::get("species").retries(1))
            .await
            .unwrap();

        assert_eq!(payload, Payload::Json(json!([{"id": "1"}])));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let backend = ScriptedBackend::repeating(response(502, Some("text/html"), vec![]));
        let err = transport(&backend).call(&Request::get("species")).await.unwrap_err();
        assert!(matches!(err, OrnithoError::BadGateway(_)));
        assert_eq!(backend.calls(), 1);
    }
}
