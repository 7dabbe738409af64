use crate::capability::Listable;
use crate::client::OrnithoClient;
use crate::entity::{EntityCore, Resource};
use crate::error::Result;
use crate::model::TaxonomicGroup;
use crate::record::field;

/// A taxon as configured on the installation
#[derive(Debug, Clone)]
pub struct Species {
    core: EntityCore,
}

impl Resource for Species {
    const ENDPOINT: &'static str = "species";
    const KIND: &'static str = "Species";

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

impl Listable for Species {}

impl Species {
    pub fn id_taxo_group(&self) -> Option<i64> {
        field(self.record(), "id_taxo_group").as_i64()
    }

    pub fn sys_order(&self) -> Option<i64> {
        field(self.record(), "sys_order").as_i64()
    }

    pub fn latin_name(&self) -> Option<&str> {
        field(self.record(), "latin_name").as_str()
    }

    pub fn german_name(&self) -> Option<&str> {
        field(self.record(), "german_name").as_str()
    }

    pub fn german_name_plur(&self) -> Option<&str> {
        field(self.record(), "german_name_plur").as_str()
    }

    pub fn english_name(&self) -> Option<&str> {
        field(self.record(), "english_name").as_str()
    }

    pub fn english_name_plur(&self) -> Option<&str> {
        field(self.record(), "english_name_plur").as_str()
    }

    pub fn french_name(&self) -> Option<&str> {
        field(self.record(), "french_name").as_str()
    }

    pub fn french_name_plur(&self) -> Option<&str> {
        field(self.record(), "french_name_plur").as_str()
    }

    pub fn rarity(&self) -> Option<&str> {
        field(self.record(), "rarity").as_str()
    }

    pub fn category_1(&self) -> Option<&str> {
        field(self.record(), "category_1").as_str()
    }

    pub fn atlas_start(&self) -> Option<i64> {
        field(self.record(), "atlas_start").as_i64()
    }

    pub fn atlas_end(&self) -> Option<i64> {
        field(self.record(), "atlas_end").as_i64()
    }

    /// Missing counts as used
    pub fn is_used(&self) -> bool {
        field(self.record(), "is_used").as_bool().unwrap_or(true)
    }

    pub async fn taxo_group(&self, client: &OrnithoClient) -> Result<Option<TaxonomicGroup>> {
        match self.id_taxo_group() {
            Some(id) => Ok(Some(TaxonomicGroup::get(client, id, false).await?)),
            None => Ok(None),
        }
    }
}
