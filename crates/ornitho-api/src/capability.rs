//! Endpoint-shaped operations a resource type can opt into
//!
//! ```ignore
//! impl Listable for Species {}
//! impl Searchable for Observation {}
//! ```

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;

use crate::client::{Fetched, OrnithoClient};
use crate::codec::{ParamValue, Params};
use crate::entity::Resource;
use crate::error::{OrnithoError, Result};
use crate::record::{Identifier, RawRecord};
use crate::transport::Request;

/// Filters and paging options for list and search calls
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub pagination_key: Option<String>,
    pub short_version: bool,
    pub params: Params,
    pub retries: u32,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn pagination_key(mut self, key: impl Into<String>) -> Self {
        self.pagination_key = Some(key.into());
        self
    }

    pub fn short_version(mut self, short_version: bool) -> Self {
        self.short_version = short_version;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    fn apply(self, request: Request) -> Request {
        request
            .pagination_key(self.pagination_key)
            .short_version(self.short_version)
            .retries(self.retries)
    }
}

impl From<Params> for ListQuery {
    fn from(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }
}

fn wrap<T: Resource>(records: Vec<RawRecord>) -> Vec<T> {
    records.into_iter().map(T::from_record).collect()
}

/// GET on the collection, filters as query parameters
#[async_trait]
pub trait Listable: Resource {
    fn list_path() -> String {
        Self::ENDPOINT.to_string()
    }

    /// One page and the token for the next one
    async fn list(client: &OrnithoClient, query: ListQuery) -> Result<(Vec<Self>, Option<String>)> {
        let params = query.params.clone();
        let request = query.apply(Request::get(Self::list_path())).params(params);
        let (records, token) = client.fetch_records(request).await?;
        Ok((wrap(records), token))
    }

    /// Every page
    async fn list_all(client: &OrnithoClient, query: ListQuery) -> Result<Vec<Self>> {
        let params = query.params.clone();
        let request = query
            .apply(Request::get(Self::list_path()))
            .pagination_key(None)
            .request_all(true)
            .params(params);
        Ok(wrap(client.records(request).await?))
    }
}

/// POST on `<collection>/search`, filters as JSON body
#[async_trait]
pub trait Searchable: Resource {
    fn search_path() -> String {
        format!("{}/search", Self::ENDPOINT)
    }

    async fn search(client: &OrnithoClient, query: ListQuery) -> Result<(Vec<Self>, Option<String>)> {
        let body = query.params.clone();
        let request = query.apply(Request::post(Self::search_path())).body(body);
        let (records, token) = client.fetch_records(request).await?;
        Ok((wrap(records), token))
    }

    async fn search_all(client: &OrnithoClient, query: ListQuery) -> Result<Vec<Self>> {
        let body = query.params.clone();
        let request = query
            .apply(Request::post(Self::search_path()))
            .pagination_key(None)
            .request_all(true)
            .body(body);
        Ok(wrap(client.records(request).await?))
    }
}

/// POST of `{"data": record}`
#[async_trait]
pub trait Createable: Resource {
    fn create_path() -> String {
        Self::ENDPOINT.to_string()
    }

    /// Create the record remotely and return the assigned identifier
    async fn create_remote(client: &OrnithoClient, record: RawRecord) -> Result<Identifier> {
        let body = Params::new().with("data", record);
        let records = client.records(Request::post(Self::create_path()).body(body)).await?;
        let id = created_identifier(&records)?;
        info!(kind = Self::KIND, id = %id, "Created entity");
        Ok(id)
    }
}

/// Identifier from a create response: `{"id": ["17"]}`, or a bare `{"id": "17"}`
pub fn created_identifier(records: &[RawRecord]) -> Result<Identifier> {
    let id = records.first().and_then(|record| match record.get("id") {
        Some(Value::Array(ids)) => ids.first().and_then(Identifier::from_value),
        Some(other) => Identifier::from_value(other),
        None => None,
    });
    id.ok_or_else(|| OrnithoError::UnexpectedResponse("create response carries no id".to_string()))
}

/// PUT of the trimmed record on the instance path
#[async_trait]
pub trait Updateable: Resource {
    /// Wraps the record as `{"data": {"<collection>": [record]}}` when set
    const UPDATE_COLLECTION: Option<&'static str> = None;

    fn update_body(&self) -> Params {
        let record = self.trim_for_write();
        match Self::UPDATE_COLLECTION {
            Some(collection) => Params::new().with("data", json!({ collection: [record] })),
            None => record.into_iter().collect(),
        }
    }

    async fn update(&mut self, client: &OrnithoClient, retries: u32) -> Result<Fetched> {
        self.ensure_not_deleted()?;
        let path = self.instance_path()?;
        let request = Request::put(path).body(self.update_body()).retries(retries);
        let (fetched, _) = client.fetch(request).await?;
        Ok(fetched)
    }
}

/// DELETE on the instance path, or a type-specific verb and endpoint
#[async_trait]
pub trait Deletable: Resource {
    const DELETE_METHOD: Method = Method::DELETE;
    const DELETE_ENDPOINT: Option<&'static str> = None;

    fn delete_path(&self) -> Result<String> {
        let id = self.require_id()?;
        Ok(format!(
            "{}/{}",
            Self::DELETE_ENDPOINT.unwrap_or(Self::ENDPOINT),
            urlencoding::encode(&id.to_string())
        ))
    }

    async fn delete(&mut self, client: &OrnithoClient) -> Result<()> {
        self.ensure_not_deleted()?;
        let path = self.delete_path()?;
        client.fetch(Request::new(Self::DELETE_METHOD, path.clone())).await?;

        info!(kind = Self::KIND, path = %path, "Deleted entity");
        self.core_mut().mark_deleted();
        Ok(())
    }
}
