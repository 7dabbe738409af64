use crate::capability::Listable;
use crate::entity::{EntityCore, Resource};
use crate::record::field;

/// Organisation running a portal or a [`Protocol`](super::Protocol)
#[derive(Debug, Clone)]
pub struct Entity {
    core: EntityCore,
}

impl Resource for Entity {
    const ENDPOINT: &'static str = "entities";
    const KIND: &'static str = "Entity";

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

impl Listable for Entity {}

impl Entity {
    pub fn short_name(&self) -> Option<&str> {
        field(self.record(), "short_name").as_str()
    }

    pub fn full_name_german(&self) -> Option<&str> {
        field(self.record(), "full_name_german").as_str()
    }

    pub fn address(&self) -> Option<&str> {
        field(self.record(), "address").as_str()
    }

    pub fn url(&self) -> Option<&str> {
        field(self.record(), "url").as_str()
    }

    pub fn description_german(&self) -> Option<&str> {
        field(self.record(), "description_german").as_str()
    }
}
