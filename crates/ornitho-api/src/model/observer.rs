use chrono::{DateTime, Local};

use crate::capability::Listable;
use crate::client::OrnithoClient;
use crate::entity::{exactly_one, EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::Right;
use crate::record::{field, timestamp};
use crate::transport::Request;

/// A registered user of the installation
///
/// Listings only carry a few fields, the profile accessors refresh lazily.
#[derive(Debug, Clone)]
pub struct Observer {
    core: EntityCore,
}

impl Resource for Observer {
    const ENDPOINT: &'static str = "observers";
    const KIND: &'static str = "Observer";

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl Listable for Observer {}

impl Observer {
    /// The account the client is authenticated as
    pub async fn current(client: &OrnithoClient) -> Result<Self> {
        let path = format!("{}/current", Self::ENDPOINT);
        let records = client.records(Request::get(path.clone())).await?;
        Ok(Self::from_record(exactly_one(path, records)?))
    }

    /// Permissions granted to this observer
    pub async fn rights(&self, client: &OrnithoClient) -> Result<Vec<Right>> {
        let id = self.require_id()?;
        let id = id
            .as_int()
            .ok_or_else(|| OrnithoError::InvalidIdentifier(id.to_string()))?;
        Right::for_observer(client, id).await
    }

    async fn text(&mut self, client: &OrnithoClient, key: &str) -> Result<Option<String>> {
        self.ensure_loaded(client, key).await?;
        Ok(field(self.record(), key).as_str().map(str::to_string))
    }

    async fn flag(&mut self, client: &OrnithoClient, key: &str) -> Result<bool> {
        self.ensure_loaded(client, key).await?;
        Ok(field(self.record(), key).as_bool().unwrap_or(true))
    }

    pub async fn name(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "name").await
    }

    pub async fn surname(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "surname").await
    }

    pub async fn email(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "email").await
    }

    pub async fn municipality(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "municipality").await
    }

    pub async fn postcode(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "postcode").await
    }

    pub async fn langu(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.text(client, "langu").await
    }

    pub async fn lat(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.ensure_loaded(client, "lat").await?;
        Ok(field(self.record(), "lat").as_f64())
    }

    pub async fn lon(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.ensure_loaded(client, "lon").await?;
        Ok(field(self.record(), "lon").as_f64())
    }

    pub async fn id_universal(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "id_universal").await?;
        Ok(field(self.record(), "id_universal").as_i64())
    }

    pub async fn registration_date(&mut self, client: &OrnithoClient) -> Result<Option<DateTime<Local>>> {
        self.ensure_loaded(client, "registration_date").await?;
        Ok(timestamp(self.record(), "registration_date"))
    }

    pub async fn last_login(&mut self, client: &OrnithoClient) -> Result<Option<DateTime<Local>>> {
        self.ensure_loaded(client, "last_login").await?;
        Ok(timestamp(self.record(), "last_login"))
    }

    pub async fn anonymous(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.flag(client, "anonymous").await
    }

    pub async fn hide_email(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.flag(client, "hide_email").await
    }

    pub async fn default_hidden(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.flag(client, "default_hidden").await
    }

    pub async fn has_search_access(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.flag(client, "has_search_access").await
    }
}
