use crate::capability::Listable;
use crate::client::OrnithoClient;
use crate::entity::{EntityCore, Resource};
use crate::error::Result;
use crate::model::TerritorialUnit;
use crate::record::field;

/// Municipality a [`Place`](super::Place) belongs to
///
/// Listings only carry a projection, so most accessors complete the record on
/// first use.
#[derive(Debug, Clone)]
pub struct LocalAdminUnit {
    core: EntityCore,
}

impl Resource for LocalAdminUnit {
    const ENDPOINT: &'static str = "local_admin_units";
    const KIND: &'static str = "LocalAdminUnit";

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

impl Listable for LocalAdminUnit {}

impl LocalAdminUnit {
    pub async fn id_canton(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "id_canton").await?;
        Ok(field(self.record(), "id_canton").as_i64())
    }

    pub async fn name(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.ensure_loaded(client, "name").await?;
        Ok(field(self.record(), "name").as_str().map(str::to_string))
    }

    /// Official municipality code
    pub async fn insee(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.ensure_loaded(client, "insee").await?;
        Ok(field(self.record(), "insee").as_str().map(str::to_string))
    }

    pub async fn coord_lat(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.ensure_loaded(client, "coord_lat").await?;
        Ok(field(self.record(), "coord_lat").as_f64())
    }

    pub async fn coord_lon(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.ensure_loaded(client, "coord_lon").await?;
        Ok(field(self.record(), "coord_lon").as_f64())
    }

    /// Unit referenced by `id_canton`, not yet fetched
    pub async fn territorial_unit(&mut self, client: &OrnithoClient) -> Result<Option<TerritorialUnit>> {
        Ok(self.id_canton(client).await?.map(TerritorialUnit::with_id))
    }
}
