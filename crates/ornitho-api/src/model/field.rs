use async_trait::async_trait;

use crate::capability::{ListQuery, Listable};
use crate::client::OrnithoClient;
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::FieldOption;
use crate::record::field;
use crate::transport::Request;

/// A configurable observation attribute, e.g. resting habitat
#[derive(Debug, Clone)]
pub struct Field {
    core: EntityCore,
}

#[async_trait]
impl Resource for Field {
    const ENDPOINT: &'static str = "fields";
    const KIND: &'static str = "Field";

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    /// `fields/<id>` lists the options, so the field comes from the full listing
    async fn refresh(&mut self, client: &OrnithoClient, short_version: bool, retries: u32) -> Result<()> {
        self.ensure_not_deleted()?;
        let id = self.require_id()?;

        let query = ListQuery::new().short_version(short_version).retries(retries);
        let found = Self::list_all(client, query)
            .await?
            .into_iter()
            .find(|field| field.id().as_ref() == Some(&id))
            .ok_or_else(|| OrnithoError::ObjectNotFound {
                path: Self::ENDPOINT.to_string(),
                found: 0,
            })?;

        self.core_mut().replace(found.core.record().clone());
        Ok(())
    }
}

impl Listable for Field {}

impl Field {
    pub fn group(&self) -> Option<&str> {
        field(self.record(), "group").as_str()
    }

    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn text(&self) -> Option<&str> {
        field(self.record(), "text").as_str()
    }

    pub fn default(&self) -> Option<i64> {
        field(self.record(), "default").as_i64()
    }

    pub fn mandatory(&self) -> bool {
        field(self.record(), "mandatory").as_bool().unwrap_or(true)
    }

    pub fn empty_choice(&self) -> bool {
        field(self.record(), "empty_choice").as_bool().unwrap_or(true)
    }

    /// Choices of this field
    pub async fn options(&self, client: &OrnithoClient) -> Result<Vec<FieldOption>> {
        let path = self.instance_path()?;
        let records = client.records(Request::get(path)).await?;
        Ok(records.into_iter().map(FieldOption::from_record).collect())
    }
}
