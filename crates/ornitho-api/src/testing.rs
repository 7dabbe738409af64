//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, TRANSFER_ENCODING};
use reqwest::StatusCode;
use serde_json::Value;

use crate::client::OrnithoClient;
use crate::config::Config;
use crate::error::{OrnithoError, Result};
use crate::transport::{HttpBackend, HttpRequest, HttpResponse, PAGINATION_HEADER};

pub fn config() -> Config {
    Config::new("key", "secret", "birder@example.org", "pw", "https://ornitho.test/api").unwrap()
}

pub fn response(status: u16, content_type: Option<&'static str>, body: Vec<u8>) -> HttpResponse {
    let mut headers = HeaderMap::new();
    if let Some(ct) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
    }
    HttpResponse::new(StatusCode::from_u16(status).unwrap(), headers, body)
}

pub fn json_response(body: Value) -> HttpResponse {
    response(200, Some("application/json; charset=utf-8"), body.to_string().into_bytes())
}

/// JSON page advertising a continuation token
pub fn paged_response(body: Value, token: &str) -> HttpResponse {
    let mut page = json_response(body);
    page.headers.insert(PAGINATION_HEADER, HeaderValue::from_str(token).unwrap());
    page.headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    page
}

/// Replays canned responses and records every physical request
pub struct ScriptedBackend {
    script: Mutex<VecDeque<HttpResponse>>,
    repeat: Option<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request with the same response
    pub fn repeating(response: HttpResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return Ok(next);
        }
        self.repeat
            .clone()
            .ok_or_else(|| OrnithoError::Connection("script exhausted".to_string()))
    }
}

/// Client wired to a scripted backend
pub fn client(responses: Vec<HttpResponse>) -> (OrnithoClient, Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::new(responses);
    (OrnithoClient::with_backend(config(), backend.clone()), backend)
}

/// Parsed JSON body of a recorded request
pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
}
