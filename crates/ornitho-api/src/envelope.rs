//! Flattening of the service's success envelopes into raw records
//!
//! Shapes seen in the wild:
//!
//! - a bare array of records
//! - `{"data": [..]}`
//! - `{"data": {"sightings": [..], "forms": [{.., "sightings": [..]}]}}`
//! - a single object, e.g. the `id` list returned by a create

use serde_json::Value;

use crate::error::{OrnithoError, Result};
use crate::record::RawRecord;

/// Extract the records of one decoded JSON page
///
/// - An array, or a `data` array, yields its objects in order.
/// - A `data` object holding `sightings` or `forms` yields the sightings, with
///   form sightings tagged by their form.
/// - Any other `data` object is itself the single record, without the
///   surrounding envelope. Lookups like `observers/rights/<id>` and
///   `protocol/sites` answer this way.
/// - A `data` value that is neither array nor object leaves the whole envelope
///   as the single record, as does an object without `data`.
/// - A scalar payload is a [`OrnithoError::Normalization`] error.
pub fn normalize(payload: Value) -> Result<Vec<RawRecord>> {
    match payload {
        Value::Array(items) => records(items),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => records(items),
            Some(Value::Object(data))
                if data.contains_key("sightings") || data.contains_key("forms") =>
            {
                observations(data)
            }
            Some(Value::Object(data)) => Ok(vec![data]),
            Some(other) => {
                envelope.insert("data".to_string(), other);
                Ok(vec![envelope])
            }
            None => Ok(vec![envelope]),
        },
        other => Err(OrnithoError::Normalization(format!(
            "expected records, got {}",
            kind(&other)
        ))),
    }
}

/// Standalone sightings first, then every form's sightings tagged with their form
fn observations(mut data: RawRecord) -> Result<Vec<RawRecord>> {
    let mut flattened = match data.remove("sightings") {
        Some(Value::Array(items)) => records(items)?,
        Some(other) => {
            return Err(OrnithoError::Normalization(format!(
                "sightings must be a list, got {}",
                kind(&other)
            )))
        }
        None => Vec::new(),
    };

    let forms = match data.remove("forms") {
        Some(Value::Array(forms)) => records(forms)?,
        Some(other) => {
            return Err(OrnithoError::Normalization(format!(
                "forms must be a list, got {}",
                kind(&other)
            )))
        }
        None => Vec::new(),
    };

    for mut form in forms {
        let sightings = match form.remove("sightings") {
            Some(Value::Array(items)) => records(items)?,
            _ => Vec::new(),
        };

        if let Some(date) = sightings.first().and_then(|s| s.get("date")) {
            form.insert("day".to_string(), date.clone());
        }

        for mut sighting in sightings {
            sighting.insert("form".to_string(), Value::Object(form.clone()));
            flattened.push(sighting);
        }
    }

    Ok(flattened)
}

fn records(items: Vec<Value>) -> Result<Vec<RawRecord>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(OrnithoError::Normalization(format!(
                "expected an object record, got {}",
                kind(&other)
            ))),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(records: Vec<RawRecord>) -> Vec<Value> {
        records.into_iter().map(Value::Object).collect()
    }

    #[test]
    fn test_bare_array() {
        let records = normalize(json!([{"id": "1"}, {"id": "2"}])).unwrap();
        assert_eq!(values(records), vec![json!({"id": "1"}), json!({"id": "2"})]);
    }

    #[test]
    fn test_data_array() {
        let records = normalize(json!({"data": [{"id": "1"}]})).unwrap();
        assert_eq!(values(records), vec![json!({"id": "1"})]);
    }

    #[test]
    fn test_forms_are_flattened() {
        let payload = json!({"data": {"forms": [{"sightings": [{"a": 1}], "other": "x"}]}});
        let records = normalize(payload).unwrap();
        assert_eq!(values(records), vec![json!({"a": 1, "form": {"other": "x"}})]);
    }

    #[test]
    fn test_sightings_precede_form_sightings() {
        let payload = json!({"data": {
            "forms": [{
                "id_form": "9",
                "sightings": [
                    {"id": "f1", "date": {"@timestamp": "1600000000"}},
                    {"id": "f2", "date": {"@timestamp": "1600000500"}}
                ]
            }],
            "sightings": [{"id": "s1"}]
        }});
        let records = normalize(payload).unwrap();

        let form = json!({"id_form": "9", "day": {"@timestamp": "1600000000"}});
        assert_eq!(
            values(records),
            vec![
                json!({"id": "s1"}),
                json!({"id": "f1", "date": {"@timestamp": "1600000000"}, "form": form.clone()}),
                json!({"id": "f2", "date": {"@timestamp": "1600000500"}, "form": form}),
            ]
        );
    }

    #[test]
    fn test_data_object_without_lists_is_one_record() {
        let records = normalize(json!({"data": {"id": "4", "name": "Lake"}})).unwrap();
        assert_eq!(values(records), vec![json!({"id": "4", "name": "Lake"})]);
    }

    #[test]
    fn test_data_object_drops_envelope_siblings() {
        let records = normalize(json!({"data": {"rights": []}, "status": "ok"})).unwrap();
        assert_eq!(values(records), vec![json!({"rights": []})]);
    }

    #[test]
    fn test_plain_object_is_one_record() {
        let records = normalize(json!({"id": ["17"]})).unwrap();
        assert_eq!(values(records), vec![json!({"id": ["17"]})]);
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(values(normalize(json!({})).unwrap()), vec![json!({})]);
    }

    #[test]
    fn test_scalar_payload_is_rejected() {
        let err = normalize(json!("ok")).unwrap_err();
        assert!(matches!(err, OrnithoError::Normalization(_)));
        assert!(normalize(json!([1, 2])).is_err());
    }
}
