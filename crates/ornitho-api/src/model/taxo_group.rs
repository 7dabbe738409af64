use crate::capability::Listable;
use crate::entity::{EntityCore, Resource};
use crate::record::field;

/// Taxonomic group, e.g. birds or dragonflies
#[derive(Debug, Clone)]
pub struct TaxonomicGroup {
    core: EntityCore,
}

impl Resource for TaxonomicGroup {
    const ENDPOINT: &'static str = "taxo_groups";
    const KIND: &'static str = "TaxonomicGroup";

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

impl Listable for TaxonomicGroup {}

impl TaxonomicGroup {
    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn latin_name(&self) -> Option<&str> {
        field(self.record(), "latin_name").as_str()
    }

    pub fn name_constant(&self) -> Option<&str> {
        field(self.record(), "name_constant").as_str()
    }

    /// `full`, `limited` or `none`, depending on the account
    pub fn access_mode(&self) -> Option<&str> {
        field(self.record(), "access_mode").as_str()
    }
}
