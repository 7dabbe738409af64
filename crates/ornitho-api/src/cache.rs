//! Optional response cache in front of an [`HttpBackend`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Method;
use tracing::debug;

use crate::error::{OrnithoError, Result};
use crate::transport::{HttpBackend, HttpRequest, HttpResponse, PAGINATION_HEADER};

const CACHE_CAPACITY: u64 = 10_000;

enum Miss {
    /// Response was fetched but must not be stored
    Uncacheable(HttpResponse),
    Failed(OrnithoError),
}

/// Caches successful GET responses keyed on the unsigned URL
///
/// Concurrent identical requests share a single physical call. Mutating verbs,
/// error statuses and paged responses are never stored.
pub struct CachedBackend<B> {
    inner: B,
    cache: Cache<String, HttpResponse>,
}

impl<B: HttpBackend> CachedBackend<B> {
    pub fn new(inner: B, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    /// Drop every stored response
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

fn cacheable(response: &HttpResponse) -> bool {
    response.status.is_success() && !response.headers.contains_key(PAGINATION_HEADER)
}

#[async_trait]
impl<B: HttpBackend> HttpBackend for CachedBackend<B> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if request.method != Method::GET {
            return self.inner.execute(request).await;
        }

        let key = request.full_url();
        if self.cache.contains_key(&key) {
            debug!(url = %request.url, "Serving cached response");
        }

        let fetched = self
            .cache
            .try_get_with(key, async {
                match self.inner.execute(request).await {
                    Ok(response) if cacheable(&response) => Ok(response),
                    Ok(response) => Err(Miss::Uncacheable(response)),
                    Err(err) => Err(Miss::Failed(err)),
                }
            })
            .await;

        fetched.or_else(|miss: Arc<Miss>| match &*miss {
            Miss::Uncacheable(response) => Ok(response.clone()),
            Miss::Failed(err) => Err(err.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_response, response, ScriptedBackend};
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn request(method: Method, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("https://ornitho.test/api/{}", path),
            query: vec![("user_email".to_string(), "birder@example.org".to_string())],
            body: None,
        }
    }

    fn cached(backend: &Arc<ScriptedBackend>) -> CachedBackend<Arc<ScriptedBackend>> {
        CachedBackend::new(backend.clone(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_repeated_get_hits_cache() {
        let backend = ScriptedBackend::repeating(json_response(json!([{"id": "1"}])));
        let cache = cached(&backend);

        let first = cache.execute(&request(Method::GET, "species/1")).await.unwrap();
        let second = cache.execute(&request(Method::GET, "species/1")).await.unwrap();
        assert_eq!(first.body, second.body);
        assert_eq!(backend.calls(), 1);

        cache.execute(&request(Method::GET, "species/2")).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_mutations_bypass_cache() {
        let backend = ScriptedBackend::repeating(json_response(json!({})));
        let cache = cached(&backend);

        for _ in 0..2 {
            cache.execute(&request(Method::POST, "observations/search")).await.unwrap();
        }
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let backend = ScriptedBackend::new(vec![
            response(503, Some("text/html"), vec![]),
            json_response(json!([])),
        ]);
        let cache = cached(&backend);

        let first = cache.execute(&request(Method::GET, "species")).await.unwrap();
        assert_eq!(first.status.as_u16(), 503);
        let second = cache.execute(&request(Method::GET, "species")).await.unwrap();
        assert_eq!(second.status.as_u16(), 200);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_paged_responses_are_not_cached() {
        let mut page = json_response(json!([{"id": "1"}]));
        page.headers.insert(PAGINATION_HEADER, HeaderValue::from_static("next"));
        let backend = ScriptedBackend::repeating(page);
        let cache = cached(&backend);

        cache.execute(&request(Method::GET, "observations")).await.unwrap();
        cache.execute(&request(Method::GET, "observations")).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = ScriptedBackend::repeating(json_response(json!([])));
        let cache = cached(&backend);

        cache.execute(&request(Method::GET, "species")).await.unwrap();
        cache.clear();
        cache.execute(&request(Method::GET, "species")).await.unwrap();
        assert_eq!(backend.calls(), 2);
    }
}
