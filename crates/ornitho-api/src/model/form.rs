use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::capability::{Createable, Deletable};
use crate::client::OrnithoClient;
use crate::codec::Params;
use crate::entity::{exactly_one, EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::model::{Observation, ObservationDraft};
use crate::record::{default_identifier, field, object, timestamp, Identifier, RawRecord};
use crate::transport::{Payload, Request};

const TIME_FORMAT: &str = "%H:%M:%S";

/// "No species" entry that opens a new form
const PLACEHOLDER_SPECIES: i64 = 10000;

/// Sightings per POST when filling a form
const SIGHTINGS_PER_REQUEST: usize = 32;

/// Input for [`Form::create`]
#[derive(Debug, Clone)]
pub struct FormDraft {
    pub time_start: NaiveTime,
    pub time_stop: NaiveTime,
    pub full_form: bool,
    pub comment: Option<String>,
    /// Protocol name
    pub protocol: Option<String>,
    pub place: Option<i64>,
    pub visit_number: Option<i64>,
    pub sequence_number: Option<i64>,
    pub observations: Vec<ObservationDraft>,
}

impl FormDraft {
    pub fn new(time_start: NaiveTime, time_stop: NaiveTime, observations: Vec<ObservationDraft>) -> Self {
        Self {
            time_start,
            time_stop,
            full_form: true,
            comment: None,
            protocol: None,
            place: None,
            visit_number: None,
            sequence_number: None,
            observations,
        }
    }

    pub fn to_record(&self) -> RawRecord {
        let mut form = Form::from_record(RawRecord::new());
        form.set_time_start(self.time_start);
        form.set_time_stop(self.time_stop);
        form.set_full_form(self.full_form);
        if let Some(ref comment) = self.comment {
            form.set_comment(comment);
        }

        let mut protocol = RawRecord::new();
        if let Some(ref name) = self.protocol {
            protocol.insert("protocol_name".to_string(), json!(name));
        }
        if let Some(visit) = self.visit_number {
            protocol.insert("visit_number".to_string(), json!(visit.to_string()));
        }
        if let Some(sequence) = self.sequence_number {
            protocol.insert("sequence_number".to_string(), json!(sequence.to_string()));
        }
        if !protocol.is_empty() {
            form.core.set("protocol", Value::Object(protocol));
        }

        let sightings: Vec<Value> = self
            .observations
            .iter()
            .map(|draft| {
                let mut draft = draft.clone();
                draft.place = draft.place.or(self.place);
                Value::Object(draft.to_record())
            })
            .collect();
        form.core.set("sightings", Value::Array(sightings));

        form.trim_for_write()
    }
}

/// A checklist grouping sightings made during one visit
#[derive(Debug, Clone)]
pub struct Form {
    core: EntityCore,
}

#[async_trait]
impl Resource for Form {
    const ENDPOINT: &'static str = "observations";
    const KIND: &'static str = "Form";

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
        default_identifier(record).or_else(|| field(record, "id_form").as_str()?.parse().ok())
    }

    /// Sightings are written back with trimmed field-option ids
    fn trim_for_write(&self) -> RawRecord {
        let mut record = self.record().clone();
        if let Some(Value::Array(sightings)) = record.get_mut("sightings") {
            for sighting in sightings.iter_mut() {
                if let Value::Object(raw) = sighting {
                    let trimmed = Observation::from_record(std::mem::take(raw)).trim_for_write();
                    *raw = trimmed;
                }
            }
        }
        record
    }

    /// Forms are only reachable through a search on their id
    async fn refresh(&mut self, client: &OrnithoClient, short_version: bool, retries: u32) -> Result<()> {
        self.ensure_not_deleted()?;
        let id = self.require_id()?;

        let path = format!("{}/search", Self::ENDPOINT);
        let request = Request::post(path.clone())
            .short_version(short_version)
            .retries(retries)
            .body(Params::new().with("id_form", &id));

        let mut payload = match client.raw(&request).await? {
            (Payload::Json(value), _) => value,
            _ => {
                return Err(OrnithoError::UnexpectedResponse(format!(
                    "form {} search did not return JSON",
                    id
                )))
            }
        };
        let forms = match payload.pointer_mut("/data/forms").map(Value::take) {
            Some(Value::Array(forms)) => forms
                .into_iter()
                .filter_map(|form| match form {
                    Value::Object(form) => Some(form),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let form = exactly_one(path, forms)?;
        self.core_mut().replace(form);
        Ok(())
    }
}

impl Createable for Form {}

impl Deletable for Form {
    const DELETE_METHOD: Method = Method::POST;
    const DELETE_ENDPOINT: Option<&'static str> = Some("observations/delete_list");
}

impl Form {
    pub fn id_form_universal(&self) -> Option<&str> {
        field(self.record(), "id_form_universal").as_str()
    }

    /// Day of the visit, from the form itself or its first sighting
    pub fn day(&self) -> Option<DateTime<Local>> {
        timestamp(self.record(), "day").or_else(|| {
            self.sighting_records()
                .next()
                .and_then(|sighting| timestamp(sighting, "date"))
        })
    }

    pub fn time_start(&self) -> Option<NaiveTime> {
        self.time("time_start")
    }

    pub fn set_time_start(&mut self, time: NaiveTime) {
        self.core.set("time_start", time.format(TIME_FORMAT).to_string());
    }

    pub fn time_stop(&self) -> Option<NaiveTime> {
        self.time("time_stop")
    }

    pub fn set_time_stop(&mut self, time: NaiveTime) {
        self.core.set("time_stop", time.format(TIME_FORMAT).to_string());
    }

    fn time(&self, key: &str) -> Option<NaiveTime> {
        let raw = field(self.record(), key).as_str()?;
        NaiveTime::parse_from_str(raw, TIME_FORMAT).ok()
    }

    /// Missing counts as a full form
    pub fn full_form(&self) -> bool {
        field(self.record(), "full_form").as_bool().unwrap_or(true)
    }

    pub fn set_full_form(&mut self, full_form: bool) {
        self.core.set("full_form", if full_form { "1" } else { "0" });
    }

    pub fn version(&self) -> Option<i64> {
        field(self.record(), "version").as_i64()
    }

    pub fn lat(&self) -> Option<f64> {
        field(self.record(), "lat").as_f64()
    }

    pub fn lon(&self) -> Option<f64> {
        field(self.record(), "lon").as_f64()
    }

    pub fn comment(&self) -> Option<&str> {
        field(self.record(), "comment").as_str()
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.core.set("comment", comment);
    }

    fn protocol_field(&self, key: &str) -> Option<&str> {
        object(self.record(), "protocol").and_then(|protocol| field(protocol, key).id())
    }

    pub fn protocol_name(&self) -> Option<&str> {
        self.protocol_field("protocol_name")
    }

    pub fn site_code(&self) -> Option<&str> {
        self.protocol_field("site_code")
    }

    pub fn visit_number(&self) -> Option<i64> {
        self.protocol_field("visit_number")?.parse().ok()
    }

    pub fn sequence_number(&self) -> Option<i64> {
        self.protocol_field("sequence_number")?.parse().ok()
    }

    /// Whether a playback was used, by species id
    pub fn playbacks(&self) -> Option<BTreeMap<i64, bool>> {
        let playback = object(self.record(), "protocol").and_then(|protocol| object(protocol, "playback"))?;
        let played = playback
            .iter()
            .filter_map(|(key, value)| {
                let species: i64 = key.trim_start_matches("Id_species_").parse().ok()?;
                Some((species, value.as_str() == Some("1")))
            })
            .collect();
        Some(played)
    }

    fn sighting_records(&self) -> impl Iterator<Item = &RawRecord> {
        self.record()
            .get("sightings")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Sightings of the form, refreshing once if the record lacks them
    pub async fn observations(&mut self, client: &OrnithoClient) -> Result<Vec<Observation>> {
        self.ensure_loaded(client, "sightings").await?;
        Ok(self
            .sighting_records()
            .cloned()
            .map(Observation::from_record)
            .collect())
    }

    /// Create the form with all its sightings and fetch it back
    ///
    /// The form is opened with a placeholder sighting, since the service ignores
    /// sighting GUIDs sent along with a new form. The sightings follow in chunks
    /// carrying the form id. If any step after opening fails, the partial form is
    /// deleted before the error is returned.
    pub async fn create(client: &OrnithoClient, draft: &FormDraft) -> Result<Self> {
        let Some(first) = draft.observations.first() else {
            return Err(OrnithoError::Unsupported(
                "a form needs at least one observation".to_string(),
            ));
        };

        let mut placeholder = ObservationDraft::new(
            first.observer,
            PLACEHOLDER_SPECIES,
            first.timing,
            first.coord_lat,
            first.coord_lon,
            0,
        );
        placeholder.precision = first.precision;
        let opening = FormDraft {
            observations: vec![placeholder],
            ..draft.clone()
        };

        let mut record = RawRecord::new();
        record.insert("forms".to_string(), json!([opening.to_record()]));
        let placeholder_id = Self::create_remote(client, record).await?;

        let id_form = match Self::form_of(client, placeholder_id.clone()).await {
            Ok(id_form) => id_form,
            Err(err) => {
                // Form id unknown, only the placeholder can be removed
                if let Err(cleanup) = Observation::with_id(placeholder_id).delete(client).await {
                    warn!(error = %cleanup, "Could not delete placeholder sighting");
                }
                return Err(err);
            }
        };
        info!(id_form, "Opened form");

        match Self::fill(client, id_form, draft).await {
            Ok(form) => Ok(form),
            Err(err) => {
                warn!(id_form, error = %err, "Form creation failed, deleting form");
                if let Err(cleanup) = Self::with_id(id_form).delete(client).await {
                    warn!(id_form, error = %cleanup, "Could not delete incomplete form");
                }
                Err(err)
            }
        }
    }

    async fn form_of(client: &OrnithoClient, sighting: Identifier) -> Result<i64> {
        let observation = Observation::get(client, sighting, false).await?;
        observation.id_form().ok_or_else(|| {
            OrnithoError::UnexpectedResponse("created sighting is not attached to a form".to_string())
        })
    }

    async fn fill(client: &OrnithoClient, id_form: i64, draft: &FormDraft) -> Result<Self> {
        for chunk in draft.observations.chunks(SIGHTINGS_PER_REQUEST) {
            let sightings: Vec<Value> = chunk
                .iter()
                .map(|observation| {
                    let mut observation = observation.clone();
                    observation.id_form = Some(id_form);
                    observation.place = observation.place.or(draft.place);
                    Value::Object(Observation::from_record(observation.to_record()).trim_for_write())
                })
                .collect();

            let mut record = RawRecord::new();
            record.insert("sightings".to_string(), Value::Array(sightings));
            Observation::create_remote(client, record).await?;
        }

        Self::get(client, id_form, false).await
    }
}
