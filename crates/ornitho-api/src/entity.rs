//! Entity core shared by every model: identity, raw record and lazy hydration

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::OrnithoClient;
use crate::error::{OrnithoError, Result};
use crate::record::{default_identifier, Identifier, RawRecord};
use crate::transport::Request;

/// State held by every entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCore {
    id: Option<Identifier>,
    record: RawRecord,
    previous: RawRecord,
    refreshed: bool,
    checked_groups: HashSet<String>,
    deleted: bool,
}

impl EntityCore {
    pub fn with_id(id: Identifier) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// A projection received from a listing or search
    pub fn from_record(record: RawRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    /// Identifier given at construction or assigned on create
    pub fn explicit_id(&self) -> Option<&Identifier> {
        self.id.as_ref()
    }

    pub fn assign_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    pub fn record(&self) -> &RawRecord {
        &self.record
    }

    /// Record as it was before the last refresh
    pub fn previous(&self) -> &RawRecord {
        &self.previous
    }

    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Set one top-level field
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record.insert(key.into(), value.into());
    }

    /// Mutable access for setters reaching into nested structures
    pub fn record_mut(&mut self) -> &mut RawRecord {
        &mut self.record
    }

    /// Swap in a fully fetched record
    pub fn replace(&mut self, record: RawRecord) {
        self.previous = std::mem::replace(&mut self.record, record);
        self.refreshed = true;
    }

    /// True the first time a field group is claimed
    fn claim_group(&mut self, group: &str) -> bool {
        self.checked_groups.insert(group.to_string())
    }
}

/// A typed view of one remote entity
///
/// Types implement the accessors to their [`EntityCore`] and may override the
/// identifier extraction, the write trimming or the refresh itself.
#[async_trait]
pub trait Resource: Sized + Send + Sync {
    /// Collection path, e.g. `observations`
    const ENDPOINT: &'static str;
    /// Human readable type name for errors
    const KIND: &'static str;

    fn from_core(core: EntityCore) -> Self;
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Identifier carried by a raw record
    fn extract_identifier(record: &RawRecord) -> Option<Identifier> {
        default_identifier(record)
    }

    fn with_id(id: impl Into<Identifier>) -> Self {
        Self::from_core(EntityCore::with_id(id.into()))
    }

    fn from_record(record: RawRecord) -> Self {
        Self::from_core(EntityCore::from_record(record))
    }

    /// Explicit identifier first, then whatever the record carries
    fn id(&self) -> Option<Identifier> {
        self.core()
            .explicit_id()
            .cloned()
            .or_else(|| Self::extract_identifier(self.core().record()))
    }

    fn require_id(&self) -> Result<Identifier> {
        self.id().ok_or(OrnithoError::MissingIdentifier(Self::KIND))
    }

    fn record(&self) -> &RawRecord {
        self.core().record()
    }

    fn is_refreshed(&self) -> bool {
        self.core().is_refreshed()
    }

    fn instance_path(&self) -> Result<String> {
        let id = self.require_id()?;
        Ok(format!(
            "{}/{}",
            Self::ENDPOINT,
            urlencoding::encode(&id.to_string())
        ))
    }

    /// Record as it should be written back
    fn trim_for_write(&self) -> RawRecord {
        self.record().clone()
    }

    fn ensure_not_deleted(&self) -> Result<()> {
        if self.core().is_deleted() {
            let path = self.instance_path().unwrap_or_else(|_| Self::ENDPOINT.to_string());
            return Err(OrnithoError::Deleted(path));
        }
        Ok(())
    }

    /// Fetch one entity by identifier
    async fn get<I: Into<Identifier> + Send>(
        client: &OrnithoClient,
        id: I,
        short_version: bool,
    ) -> Result<Self> {
        let mut entity = Self::with_id(id);
        entity.refresh(client, short_version, 0).await?;
        Ok(entity)
    }

    /// Replace the record with a fresh copy from the service
    async fn refresh(&mut self, client: &OrnithoClient, short_version: bool, retries: u32) -> Result<()> {
        self.ensure_not_deleted()?;
        let path = self.instance_path()?;

        let request = Request::get(path.clone())
            .short_version(short_version)
            .retries(retries);
        let record = exactly_one(path, client.records(request).await?)?;

        self.core_mut().replace(record);
        Ok(())
    }

    /// Refresh once if `group` is absent and the entity was never fully fetched
    async fn ensure_loaded(&mut self, client: &OrnithoClient, group: &str) -> Result<()> {
        if self.is_refreshed() || self.record().contains_key(group) || self.id().is_none() {
            return Ok(());
        }
        if !self.core_mut().claim_group(group) {
            return Ok(());
        }

        debug!(kind = Self::KIND, group, "Lazy refresh for missing field");
        self.refresh(client, false, 0).await
    }
}

/// Single record of a lookup, or [`OrnithoError::ObjectNotFound`]
pub fn exactly_one(path: String, mut records: Vec<RawRecord>) -> Result<RawRecord> {
    if records.len() != 1 {
        return Err(OrnithoError::ObjectNotFound {
            path,
            found: records.len(),
        });
    }
    Ok(records.remove(0))
}
