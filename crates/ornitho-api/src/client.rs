//! ornitho API client

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::envelope::normalize;
use crate::error::{OrnithoError, Result};
use crate::record::RawRecord;
use crate::transport::{HttpBackend, Payload, Request, Transport};

/// Result of a fetch: flattened records, or a document passed through untouched
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Records(Vec<RawRecord>),
    Pdf(Vec<u8>),
    Text(String),
}

/// Client for one ornitho installation and account
///
/// Every entity operation takes the client explicitly; independent clients share
/// no state.
pub struct OrnithoClient {
    transport: Transport,
}

impl OrnithoClient {
    pub fn new(config: Config) -> Self {
        Self {
            transport: Transport::new(config),
        }
    }

    /// Create a client from `ORNITHO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Config::from_env()?))
    }

    /// Create a client performing its calls through a custom backend
    pub fn with_backend(config: Config, backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            transport: Transport::with_backend(config, backend),
        }
    }

    pub fn config(&self) -> &Config {
        self.transport.config()
    }

    /// Perform a single call without envelope handling
    pub async fn raw(&self, request: &Request) -> Result<(Payload, Option<String>)> {
        self.transport.call(request).await
    }

    /// Perform a request and flatten its envelope
    ///
    /// With `request_all`, pages are fetched with the returned token until a page
    /// carries no token or no records. The returned token is the last page's.
    pub async fn fetch(&self, request: Request) -> Result<(Fetched, Option<String>)> {
        let (payload, mut token) = self.transport.call(&request).await?;
        let mut records = match payload {
            Payload::Json(value) => normalize(value)?,
            Payload::Pdf(bytes) => return Ok((Fetched::Pdf(bytes), token)),
            Payload::Text(text) => return Ok((Fetched::Text(text), token)),
        };
        info!(path = %request.path, count = records.len(), "Received records");

        if records.is_empty() && request.pagination_key.is_none() {
            debug!(path = %request.path, "No records received, check the filter parameters");
        }

        if request.request_all {
            let mut page_len = records.len();
            while page_len > 0 {
                let Some(key) = token.take() else {
                    break;
                };
                debug!(path = %request.path, "Fetching next page");
                let next = request.clone().pagination_key(Some(key));
                let (payload, next_token) = self.transport.call(&next).await?;

                let page = match payload {
                    Payload::Json(value) => normalize(value)?,
                    _ => {
                        return Err(OrnithoError::Normalization(format!(
                            "received a document while paging /{}",
                            request.path
                        )))
                    }
                };
                info!(path = %request.path, count = page.len(), "Received records");

                page_len = page.len();
                records.extend(page);
                token = next_token;
            }
        }

        Ok((Fetched::Records(records), token))
    }

    /// Like [`fetch`](Self::fetch), but a document payload is an error
    pub async fn fetch_records(&self, request: Request) -> Result<(Vec<RawRecord>, Option<String>)> {
        let path = request.path.clone();
        match self.fetch(request).await? {
            (Fetched::Records(records), token) => Ok((records, token)),
            (Fetched::Pdf(_), _) | (Fetched::Text(_), _) => Err(OrnithoError::Normalization(
                format!("expected records from /{}", path),
            )),
        }
    }

    /// Records of a request, discarding the token
    pub async fn records(&self, request: Request) -> Result<Vec<RawRecord>> {
        Ok(self.fetch_records(request).await?.0)
    }
}
