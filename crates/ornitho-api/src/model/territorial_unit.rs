use crate::capability::Listable;
use crate::entity::{EntityCore, Resource};
use crate::record::field;

/// County-level administrative unit ("canton" on some portals)
#[derive(Debug, Clone)]
pub struct TerritorialUnit {
    core: EntityCore,
}

impl Resource for TerritorialUnit {
    const ENDPOINT: &'static str = "territorial_units";
    const KIND: &'static str = "TerritorialUnit";

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

impl Listable for TerritorialUnit {}

impl TerritorialUnit {
    pub fn id_country(&self) -> Option<i64> {
        field(self.record(), "id_country").as_i64()
    }

    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn short_name(&self) -> Option<&str> {
        field(self.record(), "short_name").as_str()
    }
}
