use serde_json::Value;

use crate::capability::{ListQuery, Listable, Searchable};
use crate::client::OrnithoClient;
use crate::codec::Params;
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::{Entity, Observation, Site};
use crate::record::{field, Identifier};
use crate::transport::Request;

/// A structured survey scheme, e.g. a breeding bird census
#[derive(Debug, Clone)]
pub struct Protocol {
    core: EntityCore,
}

impl Resource for Protocol {
    const ENDPOINT: &'static str = "protocol";
    const KIND: &'static str = "Protocol";

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

impl Listable for Protocol {}

impl Protocol {
    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn id_entity(&self) -> Option<i64> {
        field(self.record(), "id_entity").as_i64()
    }

    pub fn start_month(&self) -> Option<i64> {
        field(self.record(), "start_month").as_i64()
    }

    /// Empty values mean "no limit"
    pub fn nbre_passage(&self) -> Option<i64> {
        field(self.record(), "nbre_passage").as_i64()
    }

    pub fn nbre_points_min(&self) -> Option<i64> {
        field(self.record(), "nbre_points_min").as_i64()
    }

    pub fn nbre_points_max(&self) -> Option<i64> {
        field(self.record(), "nbre_points_max").as_i64()
    }

    pub fn project_id(&self) -> Option<i64> {
        field(self.record(), "project_id").as_i64()
    }

    pub fn default_count(&self) -> Option<i64> {
        field(self.record(), "default_count").as_i64()
    }

    pub fn auto_hidden(&self) -> bool {
        field(self.record(), "auto_hidden").as_bool().unwrap_or(false)
    }

    pub fn only_admin_create(&self) -> bool {
        field(self.record(), "only_admin_create").as_bool().unwrap_or(false)
    }

    /// Organisation running the protocol
    pub async fn entity(&self, client: &OrnithoClient) -> Result<Option<Entity>> {
        match self.id_entity() {
            Some(id) => Ok(Some(Entity::get(client, id, false).await?)),
            None => Ok(None),
        }
    }

    /// Sites registered for this protocol
    pub async fn sites(&self, client: &OrnithoClient) -> Result<Vec<Site>> {
        let id = self.require_id()?;
        let path = format!("{}/sites", Self::ENDPOINT);
        let params = Params::new().with("id_protocol", &id);
        let records = client.records(Request::get(path).params(params)).await?;

        // One record mapping site id to site data
        let Some(by_id) = records.into_iter().next() else {
            return Ok(Vec::new());
        };

        let mut sites = Vec::with_capacity(by_id.len());
        for (site_id, data) in by_id {
            let mut core = match data {
                Value::Object(record) => EntityCore::from_record(record),
                _ => EntityCore::default(),
            };
            let site_id: Identifier = site_id.parse()?;
            core.assign_id(site_id);
            sites.push(Site::from_core(core));
        }
        Ok(sites)
    }

    fn observation_query(&self, query: ListQuery) -> Result<ListQuery> {
        let name = self
            .name()
            .ok_or_else(|| OrnithoError::Unsupported("protocol without name".to_string()))?
            .to_string();

        let mut query = query.param("only_protocol", name);
        if query.params.get("period_choice").is_none() {
            query = query.param("period_choice", "all");
        }
        Ok(query)
    }

    /// One page of the observations made under this protocol
    pub async fn observations(
        &self,
        client: &OrnithoClient,
        query: ListQuery,
    ) -> Result<(Vec<Observation>, Option<String>)> {
        Observation::search(client, self.observation_query(query)?).await
    }

    pub async fn observations_all(&self, client: &OrnithoClient, query: ListQuery) -> Result<Vec<Observation>> {
        Observation::search_all(client, self.observation_query(query)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, client, json_response};
    use serde_json::json;

    fn protocol() -> Protocol {
        let record = json!({"id": "7", "name": "CBBM", "id_entity": "3", "auto_hidden": "0"});
        Protocol::from_record(record.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_list_protocols() {
        let (client, backend) = client(vec![json_response(json!({"data": [
            {"id": "7", "name": "CBBM"},
            {"id": "8", "name": "WATERBIRDS"}
        ]}))]);
        let protocols = Protocol::list_all(&client, ListQuery::new()).await.unwrap();

        assert_eq!(protocols.len(), 2);
        assert_eq!(protocols[1].name(), Some("WATERBIRDS"));
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/protocol");
    }

    #[tokio::test]
    async fn test_sites() {
        let (client, backend) = client(vec![json_response(json!({"data": {
            "12": {"id_universal": "28_12", "custom_name": "Nordteich"},
            "13": {"id_universal": "28_13", "custom_name": "Südteich"}
        }}))]);
        let sites = protocol().sites(&client).await.unwrap();

        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id(), Some(Identifier::Int(12)));
        assert_eq!(sites[0].custom_name(), Some("Nordteich"));
        assert_eq!(sites[1].id(), Some(Identifier::Int(13)));

        let request = backend.last_request();
        assert_eq!(request.url, "https://ornitho.test/api/protocol/sites");
        assert_eq!(request.param("id_protocol"), Some("7"));
    }

    #[tokio::test]
    async fn test_observations_filter_by_name() {
        let (client, backend) = client(vec![json_response(json!({"data": []}))]);
        let query = ListQuery::new().param("id_species", 94);
        protocol().observations_all(&client, query).await.unwrap();

        let body = body_json(&backend.last_request());
        assert_eq!(
            body,
            json!({"id_species": 94, "only_protocol": "CBBM", "period_choice": "all"})
        );
    }

    #[tokio::test]
    async fn test_entity() {
        let (client, backend) = client(vec![json_response(json!({"data": [{"id": "3", "short_name": "DDA"}]}))]);
        let entity = protocol().entity(&client).await.unwrap().unwrap();

        assert_eq!(entity.short_name(), Some("DDA"));
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/entities/3");
    }

    #[test]
    fn test_getters() {
        let protocol = protocol();
        assert_eq!(protocol.id_entity(), Some(3));
        assert!(!protocol.auto_hidden());
        assert_eq!(protocol.nbre_passage(), None);
    }
}
