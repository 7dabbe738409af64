use crate::capability::Listable;
use crate::client::OrnithoClient;
use crate::entity::{EntityCore, Resource};
use crate::error::Result;
use crate::model::TaxonomicGroup;
use crate::record::field;

/// Taxonomic family within a [`TaxonomicGroup`]
#[derive(Debug, Clone)]
pub struct Family {
    core: EntityCore,
}

impl Resource for Family {
    const ENDPOINT: &'static str = "families";
    const KIND: &'static str = "Family";

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

impl Listable for Family {}

impl Family {
    pub fn id_taxo_group(&self) -> Option<i64> {
        field(self.record(), "id_taxo_group").as_i64()
    }

    pub fn name(&self) -> Option<&str> {
        field(self.record(), "name").as_str()
    }

    pub fn latin_name(&self) -> Option<&str> {
        field(self.record(), "latin_name").as_str()
    }

    /// Missing counts as generic
    pub fn generic(&self) -> bool {
        field(self.record(), "generic").as_bool().unwrap_or(true)
    }

    pub async fn taxo_group(&self, client: &OrnithoClient) -> Result<Option<TaxonomicGroup>> {
        match self.id_taxo_group() {
            Some(id) => Ok(Some(TaxonomicGroup::get(client, id, false).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ListQuery;
    use crate::testing::{client, json_response};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_families_and_group() {
        let (client, backend) = client(vec![
            json_response(json!({"data": [
                {"id": "12", "id_taxo_group": "1", "name": "Drosseln", "latin_name": "Turdidae", "generic": "0"},
                {"id": "13", "id_taxo_group": "1", "name": "Meisen", "latin_name": "Paridae"}
            ]})),
            json_response(json!({"data": [{"id": "1", "latin_name": "Aves"}]})),
        ]);
        let families = Family::list_all(&client, ListQuery::new()).await.unwrap();

        assert_eq!(families.len(), 2);
        assert_eq!(families[0].latin_name(), Some("Turdidae"));
        assert!(!families[0].generic());
        assert!(families[1].generic());
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/families");

        let group = families[0].taxo_group(&client).await.unwrap().unwrap();
        assert_eq!(group.latin_name(), Some("Aves"));
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/taxo_groups/1");
    }
}
