//! Resource types of the ornitho API

mod entity;
mod family;
mod field;
mod field_option;
mod form;
mod local_admin_unit;
mod media;
mod observation;
mod observer;
mod place;
mod protocol;
mod right;
mod site;
mod species;
mod taxo_group;
mod territorial_unit;

pub use entity::Entity;
pub use family::Family;
pub use field::Field;
pub use field_option::FieldOption;
pub use form::{Form, FormDraft};
pub use local_admin_unit::LocalAdminUnit;
pub use media::Media;
pub use observation::{Detail, DiffFilter, EstimationCode, Observation, ObservationDraft, Precision};
pub use observer::Observer;
pub use place::Place;
pub use protocol::Protocol;
pub use right::Right;
pub use site::{MapLayer, Site, SitePdf};
pub use species::Species;
pub use taxo_group::TaxonomicGroup;
pub use territorial_unit::TerritorialUnit;

use serde::{Deserialize, Serialize};

use crate::codec::{iso_local, ParamValue};
use crate::error::{OrnithoError, Result};

/// Which changes a diff query reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    OnlyModified,
    OnlyDeleted,
    All,
}

impl ModificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnlyModified => "only_modified",
            Self::OnlyDeleted => "only_deleted",
            Self::All => "all",
        }
    }
}

/// ISO timestamp of a diff's lower bound
fn diff_since(since: ParamValue) -> Result<String> {
    iso_local(&since).ok_or_else(|| {
        OrnithoError::Unsupported(format!("diff needs a date or datetime, got {:?}", since))
    })
}
