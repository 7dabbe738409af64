use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::capability::{Createable, Deletable, ListQuery, Listable, Searchable, Updateable};
use crate::client::OrnithoClient;
use crate::codec::{ParamValue, Params};
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::{diff_since, FieldOption, ModificationType, Observer, Place, Species};
use crate::record::{field, first_object, object, timestamp, FieldValue, Identifier, RawRecord};
use crate::transport::Request;

/// Observer fields holding field-option ids that are written back as the bare value
const FIELD_OPTION_KEYS: &[&str] = &["resting_habitat", "observation_detail"];

/// How exactly the location of an observation is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Precise,
    Place,
    Square,
    Municipality,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precise => "precise",
            Self::Place => "place",
            Self::Square => "square",
            Self::Municipality => "municipality",
        }
    }
}

/// How the count was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimationCode {
    ExactValue,
    Estimation,
    Minimum,
}

impl EstimationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactValue => "EXACT_VALUE",
            Self::Estimation => "ESTIMATION",
            Self::Minimum => "MINIMUM",
        }
    }
}

/// Count of individuals by sex and age
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub count: i64,
    pub sex: String,
    pub age: String,
}

impl Detail {
    fn to_json(&self) -> Value {
        json!({
            "count": self.count.to_string(),
            "sex": {"@id": self.sex},
            "age": {"@id": self.age},
        })
    }
}

/// Input for [`Observation::create`]
#[derive(Debug, Clone)]
pub struct ObservationDraft {
    pub observer: i64,
    pub species: i64,
    pub timing: DateTime<Local>,
    pub coord_lat: f64,
    pub coord_lon: f64,
    pub precision: Precision,
    pub estimation_code: EstimationCode,
    pub count: i64,
    pub place: Option<i64>,
    pub id_form: Option<i64>,
    pub comment: Option<String>,
    pub hidden_comment: Option<String>,
    pub hidden: bool,
    pub atlas_code: Option<String>,
    pub details: Vec<Detail>,
    pub resting_habitat: Option<String>,
    pub observation_detail: Option<String>,
}

impl ObservationDraft {
    pub fn new(
        observer: i64,
        species: i64,
        timing: DateTime<Local>,
        coord_lat: f64,
        coord_lon: f64,
        count: i64,
    ) -> Self {
        Self {
            observer,
            species,
            timing,
            coord_lat,
            coord_lon,
            precision: Precision::Precise,
            estimation_code: EstimationCode::ExactValue,
            count,
            place: None,
            id_form: None,
            comment: None,
            hidden_comment: None,
            hidden: false,
            atlas_code: None,
            details: Vec::new(),
            resting_habitat: None,
            observation_detail: None,
        }
    }

    /// Record in the shape the service returns for sightings
    pub fn to_record(&self) -> RawRecord {
        let timing = json!({"@timestamp": self.timing.timestamp().to_string()});

        let mut observer = Map::new();
        observer.insert("@id".to_string(), json!(self.observer.to_string()));
        observer.insert("timing".to_string(), timing.clone());
        observer.insert("coord_lat".to_string(), json!(self.coord_lat.to_string()));
        observer.insert("coord_lon".to_string(), json!(self.coord_lon.to_string()));
        observer.insert("precision".to_string(), json!(self.precision.as_str()));
        observer.insert("estimation_code".to_string(), json!(self.estimation_code.as_str()));
        observer.insert("count".to_string(), json!(self.count.to_string()));
        observer.insert("hidden".to_string(), json!(if self.hidden { "1" } else { "0" }));
        if let Some(id_form) = self.id_form {
            observer.insert("id_form".to_string(), json!(id_form.to_string()));
        }
        if let Some(ref comment) = self.comment {
            observer.insert("comment".to_string(), json!(comment));
        }
        if let Some(ref comment) = self.hidden_comment {
            observer.insert("hidden_comment".to_string(), json!(comment));
        }
        if let Some(ref atlas_code) = self.atlas_code {
            observer.insert("atlas_code".to_string(), json!({"@id": atlas_code}));
        }
        if !self.details.is_empty() {
            let details: Vec<Value> = self.details.iter().map(Detail::to_json).collect();
            observer.insert("details".to_string(), Value::Array(details));
        }
        if let Some(ref habitat) = self.resting_habitat {
            observer.insert("resting_habitat".to_string(), json!(habitat));
        }
        if let Some(ref detail) = self.observation_detail {
            observer.insert("observation_detail".to_string(), json!(detail));
        }

        let mut record = Map::new();
        record.insert("date".to_string(), timing);
        record.insert("species".to_string(), json!({"@id": self.species.to_string()}));
        if let Some(place) = self.place {
            record.insert("place".to_string(), json!({"@id": place.to_string()}));
        }
        record.insert("observers".to_string(), json!([observer]));
        record
    }
}

/// A single sighting
///
/// Nearly all attributes live in the first entry of the `observers` list.
#[derive(Debug, Clone)]
pub struct Observation {
    core: EntityCore,
}

impl Resource for Observation {
    const ENDPOINT: &'static str = "observations";
    const KIND: &'static str = "Observation";

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn extract_identifier(record: &RawRecord) -> Option<Identifier> {
        first_object(record, "observers")
            .and_then(|observer| field(observer, "id_sighting").as_str())
            .and_then(|id| id.parse().ok())
    }

    fn trim_for_write(&self) -> RawRecord {
        let mut record = self.record().clone();
        let observer = record
            .get_mut("observers")
            .and_then(Value::as_array_mut)
            .and_then(|observers| observers.first_mut())
            .and_then(Value::as_object_mut);

        if let Some(observer) = observer {
            for key in FIELD_OPTION_KEYS {
                let trimmed = FieldValue::from_value(observer.get(*key))
                    .trailing_value()
                    .map(str::to_string);
                if let Some(value) = trimmed {
                    observer.insert(key.to_string(), Value::String(value));
                }
            }
        }
        record
    }
}

impl Listable for Observation {}
impl Searchable for Observation {}
impl Createable for Observation {}
impl Deletable for Observation {}

impl Updateable for Observation {
    const UPDATE_COLLECTION: Option<&'static str> = Some("sightings");
}

impl Observation {
    fn observer_record(&self) -> Option<&RawRecord> {
        first_object(self.record(), "observers")
    }

    fn observer_field(&self, key: &str) -> FieldValue<'_> {
        match self.observer_record() {
            Some(observer) => field(observer, key),
            None => FieldValue::Missing,
        }
    }

    fn observer_record_mut(&mut self) -> Result<&mut RawRecord> {
        self.core_mut()
            .record_mut()
            .get_mut("observers")
            .and_then(Value::as_array_mut)
            .and_then(|observers| observers.first_mut())
            .and_then(Value::as_object_mut)
            .ok_or_else(|| OrnithoError::Unsupported("observation without observer entry".to_string()))
    }

    fn set_observer_field(&mut self, key: &str, value: Value) -> Result<()> {
        self.observer_record_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    pub fn id_observer(&self) -> Option<i64> {
        self.observer_record()
            .and_then(|observer| field(observer, "@id").as_i64())
    }

    pub fn traid(&self) -> Option<i64> {
        self.observer_field("traid").as_i64()
    }

    pub fn guid(&self) -> Option<&str> {
        self.observer_field("guid").as_str()
    }

    pub fn timing(&self) -> Option<DateTime<Local>> {
        self.observer_record().and_then(|observer| timestamp(observer, "timing"))
    }

    pub fn coord_lat(&self) -> Option<f64> {
        self.observer_field("coord_lat").as_f64()
    }

    pub fn coord_lon(&self) -> Option<f64> {
        self.observer_field("coord_lon").as_f64()
    }

    pub fn altitude(&self) -> Option<i64> {
        self.observer_field("altitude").as_i64()
    }

    pub fn id_form(&self) -> Option<i64> {
        self.observer_field("id_form").as_i64()
    }

    pub fn precision(&self) -> Option<&str> {
        self.observer_field("precision").as_str()
    }

    pub fn estimation_code(&self) -> Option<&str> {
        self.observer_field("estimation_code").as_str()
    }

    pub fn count(&self) -> Option<i64> {
        self.observer_field("count").as_i64()
    }

    pub fn set_count(&mut self, count: i64) -> Result<()> {
        self.set_observer_field("count", Value::String(count.to_string()))
    }

    pub fn flight_number(&self) -> Option<i64> {
        self.observer_field("flight_number").as_i64()
    }

    pub fn source(&self) -> Option<&str> {
        self.observer_field("source").as_str()
    }

    pub fn comment(&self) -> Option<&str> {
        self.observer_field("comment").as_str()
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        self.set_observer_field("comment", Value::String(comment.to_string()))
    }

    pub fn hidden_comment(&self) -> Option<&str> {
        self.observer_field("hidden_comment").as_str()
    }

    pub fn set_hidden_comment(&mut self, comment: &str) -> Result<()> {
        self.set_observer_field("hidden_comment", Value::String(comment.to_string()))
    }

    /// Missing counts as visible
    pub fn hidden(&self) -> bool {
        self.observer_field("hidden").as_bool().unwrap_or(false)
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Result<()> {
        let value = if hidden { "1" } else { "0" };
        self.set_observer_field("hidden", Value::String(value.to_string()))
    }

    pub fn atlas_code(&self) -> Option<&str> {
        self.observer_field("atlas_code").id()
    }

    pub fn details(&self) -> Vec<Detail> {
        let Some(details) = self
            .observer_record()
            .and_then(|observer| observer.get("details"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        details
            .iter()
            .filter_map(Value::as_object)
            .map(|detail| Detail {
                count: field(detail, "count").as_i64().unwrap_or(0),
                sex: field(detail, "sex").id().unwrap_or_default().to_string(),
                age: field(detail, "age").id().unwrap_or_default().to_string(),
            })
            .collect()
    }

    pub fn insert_date(&self) -> Option<DateTime<Local>> {
        self.observer_record().and_then(|observer| timestamp(observer, "insert_date"))
    }

    pub fn update_date(&self) -> Option<DateTime<Local>> {
        self.observer_record().and_then(|observer| timestamp(observer, "update_date"))
    }

    pub fn id_species(&self) -> Option<i64> {
        object(self.record(), "species").and_then(|species| field(species, "@id").as_i64())
    }

    pub fn id_place(&self) -> Option<i64> {
        object(self.record(), "place").and_then(|place| field(place, "@id").as_i64())
    }

    /// `"<field>_<value>"` id of the resting habitat option
    pub fn id_resting_habitat(&self) -> Option<&str> {
        self.observer_field("resting_habitat").id()
    }

    pub fn id_observation_detail(&self) -> Option<&str> {
        self.observer_field("observation_detail").id()
    }

    /// Ids of attached media
    pub fn id_medias(&self) -> Vec<i64> {
        self.medias_raw()
            .filter_map(|media| field(media, "@id").as_i64())
            .collect()
    }

    pub fn media_urls(&self) -> Vec<String> {
        self.medias_raw()
            .filter_map(|media| {
                let path = field(media, "path").as_str()?;
                let filename = field(media, "filename").as_str()?;
                Some(format!("{}/{}", path, filename))
            })
            .collect()
    }

    fn medias_raw(&self) -> impl Iterator<Item = &RawRecord> {
        self.observer_record()
            .and_then(|observer| observer.get("medias"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Parent form of a sighting received inside a form envelope
    pub fn form_record(&self) -> Option<&RawRecord> {
        object(self.record(), "form")
    }

    pub async fn species(&self, client: &OrnithoClient) -> Result<Species> {
        let id = self.id_species().ok_or(OrnithoError::MissingIdentifier(Species::KIND))?;
        Species::get(client, id, false).await
    }

    pub async fn observer(&self, client: &OrnithoClient) -> Result<Observer> {
        let id = self.id_observer().ok_or(OrnithoError::MissingIdentifier(Observer::KIND))?;
        Observer::get(client, id, false).await
    }

    pub async fn place(&self, client: &OrnithoClient) -> Result<Place> {
        let id = self.id_place().ok_or(OrnithoError::MissingIdentifier(Place::KIND))?;
        Place::get(client, id, false).await
    }

    pub async fn resting_habitat(&self, client: &OrnithoClient) -> Result<Option<FieldOption>> {
        match self.id_resting_habitat() {
            Some(id) => Ok(Some(FieldOption::get(client, id, false).await?)),
            None => Ok(None),
        }
    }

    pub async fn observation_detail(&self, client: &OrnithoClient) -> Result<Option<FieldOption>> {
        match self.id_observation_detail() {
            Some(id) => Ok(Some(FieldOption::get(client, id, false).await?)),
            None => Ok(None),
        }
    }

    /// One page of an observer's sightings
    pub async fn by_observer(
        client: &OrnithoClient,
        id_observer: i64,
        query: ListQuery,
    ) -> Result<(Vec<Self>, Option<String>)> {
        Self::list(client, query.param("id_observer", id_observer)).await
    }

    pub async fn by_observer_all(client: &OrnithoClient, id_observer: i64, query: ListQuery) -> Result<Vec<Self>> {
        Self::list_all(client, query.param("id_observer", id_observer)).await
    }

    /// Create a sighting and fetch it back
    pub async fn create(client: &OrnithoClient, draft: &ObservationDraft) -> Result<Self> {
        let mut record = RawRecord::new();
        record.insert("sightings".to_string(), json!([draft.to_record()]));

        let id = Self::create_remote(client, record).await?;
        Self::get(client, id, false).await
    }

    /// Sightings changed since a point in time
    ///
    /// `since` must be a date or datetime. With `retrieve`, every sighting is
    /// fetched in full.
    pub async fn diff(
        client: &OrnithoClient,
        since: impl Into<ParamValue>,
        filter: DiffFilter,
        retrieve: bool,
    ) -> Result<Vec<Self>> {
        let mut params = Params::new();
        if let Some(modification_type) = filter.modification_type {
            params.insert("modification_type", modification_type.as_str());
        }
        if let Some(id_taxo_group) = filter.id_taxo_group {
            params.insert("id_taxo_group", id_taxo_group);
        }
        if let Some(protocol) = filter.only_protocol {
            params.insert("only_protocol", protocol);
        }
        if filter.only_form {
            params.insert("only_form", true);
        }
        params.insert("date", diff_since(since.into())?);

        let path = format!("{}/diff", Self::ENDPOINT);
        let changes = client.records(Request::get(path).params(params)).await?;
        info!(count = changes.len(), "Observations changed");

        let mut observations = Vec::with_capacity(changes.len());
        for change in changes {
            let id: Identifier = field(&change, "id_sighting")
                .as_str()
                .ok_or_else(|| OrnithoError::UnexpectedResponse("diff entry without id_sighting".to_string()))?
                .parse()?;
            if retrieve {
                observations.push(Self::get(client, id, false).await?);
            } else {
                observations.push(Self::with_id(id));
            }
        }
        Ok(observations)
    }
}

/// Filters of [`Observation::diff`]
#[derive(Debug, Clone, Default)]
pub struct DiffFilter {
    pub modification_type: Option<ModificationType>,
    pub id_taxo_group: Option<i64>,
    /// Protocol name
    pub only_protocol: Option<String>,
    pub only_form: bool,
}
