use async_trait::async_trait;

use crate::client::OrnithoClient;
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::record::field;
use crate::transport::Request;

/// One choice of a [`Field`](super::Field), identified as `"<field>_<value>"`
#[derive(Debug, Clone)]
pub struct FieldOption {
    core: EntityCore,
}

#[async_trait]
impl Resource for FieldOption {
    const ENDPOINT: &'static str = "fields";
    const KIND: &'static str = "FieldOption";

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    /// Options have no endpoint of their own; scan the parent field's options
    async fn refresh(&mut self, client: &OrnithoClient, short_version: bool, retries: u32) -> Result<()> {
        self.ensure_not_deleted()?;
        let id = self.require_id()?;
        let (field_id, _) = id
            .parts()
            .ok_or_else(|| OrnithoError::InvalidIdentifier(format!("{} (expected <field>_<value>)", id)))?;

        let path = format!("{}/{}", Self::ENDPOINT, urlencoding::encode(field_id));
        let request = Request::get(path.clone())
            .short_version(short_version)
            .retries(retries);
        let option = client
            .records(request)
            .await?
            .into_iter()
            .find(|record| Self::extract_identifier(record).as_ref() == Some(&id))
            .ok_or(OrnithoError::ObjectNotFound { path, found: 0 })?;

        self.core_mut().replace(option);
        Ok(())
    }
}

impl FieldOption {
    /// Id of the field this option belongs to
    pub fn id_field(&self) -> Option<i64> {
        self.id()?.parts()?.0.parse().ok()
    }

    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn text(&self) -> Option<&str> {
        field(self.record(), "text").as_str()
    }

    pub fn value(&self) -> Option<i64> {
        field(self.record(), "value").as_i64()
    }

    pub fn order_id(&self) -> Option<i64> {
        field(self.record(), "order_id").as_i64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Identifier;
    use crate::testing::{client, json_response};
    use serde_json::json;

    fn options() -> serde_json::Value {
        json!({"data": [
            {"id": "1_4", "name": "WOODLAND", "text": "Wald", "value": "4", "order_id": "4"},
            {"id": "1_5", "name": "GRASSLAND", "text": "Grünland", "value": "5", "order_id": "5"}
        ]})
    }

    #[tokio::test]
    async fn test_get_scans_parent_field() {
        let (client, backend) = client(vec![json_response(options())]);
        let option = FieldOption::get(&client, "1_5", false).await.unwrap();

        assert_eq!(option.id(), Some(Identifier::Composite("1_5".to_string())));
        assert_eq!(option.text(), Some("Grünland"));
        assert_eq!(option.value(), Some(5));
        assert_eq!(option.id_field(), Some(1));
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/fields/1");
    }

    #[tokio::test]
    async fn test_unknown_option() {
        let (client, _) = client(vec![json_response(options())]);
        let err = FieldOption::get(&client, "1_9", false).await.unwrap_err();
        assert!(matches!(err, OrnithoError::ObjectNotFound { found: 0, .. }));
    }

    #[tokio::test]
    async fn test_plain_identifier_is_rejected() {
        let (client, backend) = client(vec![]);
        let err = FieldOption::get(&client, 15, false).await.unwrap_err();
        assert!(matches!(err, OrnithoError::InvalidIdentifier(_)));
        assert_eq!(backend.calls(), 0);
    }
}
