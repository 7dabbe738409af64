use chrono::{DateTime, Local};

use crate::entity::{EntityCore, Resource};
use crate::record::{field, timestamp};

/// A photo or sound attached to an observation
#[derive(Debug, Clone)]
pub struct Media {
    core: EntityCore,
}

impl Resource for Media {
    const ENDPOINT: &'static str = "media";
    const KIND: &'static str = "Media";

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

impl Media {
    /// Observer id
    pub fn obid(&self) -> Option<i64> {
        field(self.record(), "obid").as_i64()
    }

    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn surname(&self) -> Option<&str> {
        field(self.record(), "surname").as_str()
    }

    /// `PHOTO`, `SOUND`, ...
    pub fn media(&self) -> Option<&str> {
        field(self.record(), "media").as_str()
    }

    pub fn has_large(&self) -> bool {
        field(self.record(), "has_large").as_bool().unwrap_or(false)
    }

    pub fn insert_date(&self) -> Option<DateTime<Local>> {
        timestamp(self.record(), "insert_date")
    }

    fn is_photo(&self) -> bool {
        self.media() == Some("PHOTO")
    }

    /// Largest available rendition
    pub fn photo(&self) -> Option<String> {
        let photo = field(self.record(), "photo").as_str()?;
        if !self.is_photo() {
            return Some(photo.to_string());
        }
        if self.has_large() {
            Some(photo.replace("xsmall", "large"))
        } else {
            Some(photo.replace("xsmall/", ""))
        }
    }

    pub fn photo_small(&self) -> Option<&str> {
        if !self.is_photo() {
            return None;
        }
        field(self.record(), "photo").as_str()
    }
}
