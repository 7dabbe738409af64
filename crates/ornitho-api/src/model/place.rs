use chrono::{DateTime, Local};
use tracing::info;

use crate::capability::{ListQuery, Listable};
use crate::client::OrnithoClient;
use crate::codec::{ParamValue, Params};
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::{diff_since, LocalAdminUnit, ModificationType};
use crate::record::{field, timestamp, Identifier};
use crate::transport::Request;

/// A named locality observations can be attached to
#[derive(Debug, Clone)]
pub struct Place {
    core: EntityCore,
    modification_type: Option<ModificationType>,
}

impl Resource for Place {
    const ENDPOINT: &'static str = "places";
    const KIND: &'static str = "Place";

    fn from_core(core: EntityCore) -> Self {
        Self {
            core,
            modification_type: None,
        }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl Listable for Place {}

impl Place {
    /// Set on places returned by [`Place::diff`]
    pub fn modification_type(&self) -> Option<ModificationType> {
        self.modification_type
    }

    pub async fn name(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.ensure_loaded(client, "name").await?;
        Ok(field(self.record(), "name").as_str().map(str::to_string))
    }

    pub async fn id_commune(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "id_commune").await?;
        Ok(field(self.record(), "id_commune").as_i64())
    }

    /// Municipality of the place
    pub async fn local_admin_unit(&mut self, client: &OrnithoClient) -> Result<Option<LocalAdminUnit>> {
        match self.id_commune(client).await? {
            Some(id) => Ok(Some(LocalAdminUnit::get(client, id, false).await?)),
            None => Ok(None),
        }
    }

    pub async fn id_region(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "id_region").await?;
        Ok(field(self.record(), "id_region").as_i64())
    }

    pub async fn altitude(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "altitude").await?;
        Ok(field(self.record(), "altitude").as_i64())
    }

    pub async fn place_type(&mut self, client: &OrnithoClient) -> Result<Option<String>> {
        self.ensure_loaded(client, "place_type").await?;
        Ok(field(self.record(), "place_type").as_str().map(str::to_string))
    }

    pub async fn loc_precision(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "loc_precision").await?;
        Ok(field(self.record(), "loc_precision").as_i64())
    }

    pub async fn visible(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.ensure_loaded(client, "visible").await?;
        Ok(field(self.record(), "visible").as_bool().unwrap_or(true))
    }

    pub async fn is_private(&mut self, client: &OrnithoClient) -> Result<bool> {
        self.ensure_loaded(client, "is_private").await?;
        Ok(field(self.record(), "is_private").as_bool().unwrap_or(true))
    }

    /// Observation projections carry `lat`/`lon` instead of `coord_lat`/`coord_lon`
    async fn coordinate(&mut self, client: &OrnithoClient, key: &str, short: &str) -> Result<Option<f64>> {
        if !self.record().contains_key(short) {
            self.ensure_loaded(client, key).await?;
        }
        let record = self.record();
        Ok(field(record, key).as_f64().or_else(|| field(record, short).as_f64()))
    }

    pub async fn coord_lat(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.coordinate(client, "coord_lat", "lat").await
    }

    pub async fn coord_lon(&mut self, client: &OrnithoClient) -> Result<Option<f64>> {
        self.coordinate(client, "coord_lon", "lon").await
    }

    pub async fn created_by(&mut self, client: &OrnithoClient) -> Result<Option<i64>> {
        self.ensure_loaded(client, "created_by").await?;
        Ok(field(self.record(), "created_by").as_i64())
    }

    pub async fn created_date(&mut self, client: &OrnithoClient) -> Result<Option<DateTime<Local>>> {
        self.ensure_loaded(client, "created_date").await?;
        Ok(timestamp(self.record(), "created_date"))
    }

    pub async fn last_updated_date(&mut self, client: &OrnithoClient) -> Result<Option<DateTime<Local>>> {
        self.ensure_loaded(client, "last_updated_date").await?;
        Ok(timestamp(self.record(), "last_updated_date"))
    }

    /// Only present on places embedded in observations
    pub fn municipality(&self) -> Option<&str> {
        field(self.record(), "municipality").as_str()
    }

    pub fn county(&self) -> Option<&str> {
        field(self.record(), "county").as_str()
    }

    pub fn country(&self) -> Option<&str> {
        field(self.record(), "country").as_str()
    }

    /// Closest place to a coordinate
    pub async fn find_closest_place(
        client: &OrnithoClient,
        coord_lat: f64,
        coord_lon: f64,
        get_hidden: bool,
    ) -> Result<Self> {
        let query = ListQuery::new()
            .param("find_closest_place", true)
            .param("coord_lat", coord_lat)
            .param("coord_lon", coord_lon)
            .param("get_hidden", get_hidden);

        Self::list_all(client, query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrnithoError::ObjectNotFound {
                path: Self::ENDPOINT.to_string(),
                found: 0,
            })
    }

    /// Places changed since a point in time
    ///
    /// `since` must be a date or datetime. With `retrieve`, updated places are
    /// fetched in full; deleted ones only carry their identifier.
    pub async fn diff(
        client: &OrnithoClient,
        since: impl Into<ParamValue>,
        modification_type: Option<ModificationType>,
        only_protocol: Option<&str>,
        retrieve: bool,
    ) -> Result<Vec<Self>> {
        let mut params = Params::new();
        if let Some(modification_type) = modification_type {
            params.insert("modification_type", modification_type.as_str());
        }
        if let Some(protocol) = only_protocol {
            params.insert("only_protocol", protocol);
        }
        params.insert("date", diff_since(since.into())?);

        let path = format!("{}/diff", Self::ENDPOINT);
        let changes = client.records(Request::get(path).params(params)).await?;
        info!(count = changes.len(), "Places changed");

        let mut places = Vec::with_capacity(changes.len());
        for change in changes {
            let id: Identifier = field(&change, "id_place")
                .as_str()
                .ok_or_else(|| OrnithoError::UnexpectedResponse("diff entry without id_place".to_string()))?
                .parse()?;
            let modification_type = match field(&change, "modification_type").as_str() {
                Some("updated") => ModificationType::OnlyModified,
                _ => ModificationType::OnlyDeleted,
            };

            let mut place = if retrieve && modification_type == ModificationType::OnlyModified {
                Self::get(client, id, false).await?
            } else {
                Self::with_id(id)
            };
            place.modification_type = Some(modification_type);
            places.push(place);
        }
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, json_response};
    use chrono::NaiveDate;
    use serde_json::json;

    fn lake() -> serde_json::Value {
        json!({
            "id": "779198",
            "name": "Mohrbach-Aufstauung",
            "coord_lat": "49.443127",
            "coord_lon": "7.575154",
            "altitude": "233",
            "id_commune": "28",
            "visible": "1",
            "is_private": "0"
        })
    }

    #[tokio::test]
    async fn test_lazy_accessors_refresh_once() {
        let (client, backend) = client(vec![json_response(json!([lake()]))]);
        let mut place = Place::with_id(779198);

        assert_eq!(place.name(&client).await.unwrap().as_deref(), Some("Mohrbach-Aufstauung"));
        assert_eq!(place.altitude(&client).await.unwrap(), Some(233));
        assert_eq!(place.coord_lat(&client).await.unwrap(), Some(49.443127));
        assert_eq!(place.id_commune(&client).await.unwrap(), Some(28));
        assert!(!place.is_private(&client).await.unwrap());
        assert_eq!(backend.calls(), 1);
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/places/779198");
    }

    #[tokio::test]
    async fn test_local_admin_unit() {
        let (client, backend) = client(vec![
            json_response(json!([lake()])),
            json_response(json!({"data": [{"id": "28", "name": "Kaiserslautern", "id_canton": "7"}]})),
        ]);
        let mut place = Place::with_id(779198);
        let mut commune = place.local_admin_unit(&client).await.unwrap().unwrap();

        assert_eq!(commune.id(), Some(Identifier::Int(28)));
        assert_eq!(commune.name(&client).await.unwrap().as_deref(), Some("Kaiserslautern"));
        assert_eq!(backend.calls(), 2);
        assert_eq!(backend.last_request().url, "https://ornitho.test/api/local_admin_units/28");
    }

    #[tokio::test]
    async fn test_embedded_coordinates() {
        let (client, backend) = client(vec![]);
        let record = json!({"@id": "1", "lat": "49.4", "lon": "7.5"});
        let mut place = Place::from_record(record.as_object().cloned().unwrap());

        assert_eq!(place.coord_lat(&client).await.unwrap(), Some(49.4));
        assert_eq!(place.coord_lon(&client).await.unwrap(), Some(7.5));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_find_closest_place() {
        let (client, backend) = client(vec![json_response(json!([lake()]))]);
        let place = Place::find_closest_place(&client, 49.44, 7.57, false).await.unwrap();

        assert_eq!(place.id(), Some(Identifier::Int(779198)));
        let request = backend.last_request();
        assert_eq!(request.param("find_closest_place"), Some("1"));
        assert_eq!(request.param("get_hidden"), Some("0"));
        assert_eq!(request.param("coord_lat"), Some("49.44"));
    }

    #[tokio::test]
    async fn test_find_closest_place_without_result() {
        let (client, _) = client(vec![json_response(json!([]))]);
        let err = Place::find_closest_place(&client, 0.0, 0.0, true).await.unwrap_err();
        assert!(matches!(err, OrnithoError::ObjectNotFound { found: 0, .. }));
    }

    #[tokio::test]
    async fn test_diff() {
        let (client, backend) = client(vec![json_response(json!([
            {"id_place": "1", "modification_type": "updated"},
            {"id_place": "2", "modification_type": "deleted"}
        ]))]);
        let since = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let places = Place::diff(&client, since, Some(ModificationType::All), Some("CBBM"), false)
            .await
            .unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].modification_type(), Some(ModificationType::OnlyModified));
        assert_eq!(places[1].modification_type(), Some(ModificationType::OnlyDeleted));
        assert_eq!(places[1].id(), Some(Identifier::Int(2)));

        let request = backend.last_request();
        assert_eq!(request.url, "https://ornitho.test/api/places/diff");
        assert_eq!(request.param("date"), Some("2020-01-02T03:04:05"));
        assert_eq!(request.param("modification_type"), Some("all"));
        assert_eq!(request.param("only_protocol"), Some("CBBM"));
    }

    #[tokio::test]
    async fn test_diff_retrieves_updated_places() {
        let (client, backend) = client(vec![
            json_response(json!([
                {"id_place": "779198", "modification_type": "updated"},
                {"id_place": "2", "modification_type": "deleted"}
            ])),
            json_response(json!([lake()])),
        ]);
        let since = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut places = Place::diff(&client, since, None, None, true).await.unwrap();

        assert!(places[0].is_refreshed());
        assert!(!places[1].is_refreshed());
        assert_eq!(backend.calls(), 2);
        assert_eq!(
            places[0].name(&client).await.unwrap().as_deref(),
            Some("Mohrbach-Aufstauung")
        );
    }

    #[tokio::test]
    async fn test_diff_rejects_non_dates() {
        let (client, backend) = client(vec![]);
        let err = Place::diff(&client, 5, None, None, false).await.unwrap_err();
        assert!(matches!(err, OrnithoError::Unsupported(_)));
        assert_eq!(backend.calls(), 0);
    }
}
