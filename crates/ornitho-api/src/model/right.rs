use serde_json::Value;

use crate::client::OrnithoClient;
use crate::error::{OrnithoError, Result};
use crate::record::field;
use crate::transport::Request;

/// A permission granted to an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    pub id: i64,
    pub name: String,
    pub comment: String,
}

impl Right {
    pub const ENDPOINT: &'static str = "observers/rights";

    /// Rights of one observer; an observer without rights yields an empty list
    pub async fn for_observer(client: &OrnithoClient, id_observer: i64) -> Result<Vec<Self>> {
        let path = format!("{}/{}", Self::ENDPOINT, id_observer);
        let records = client.records(Request::get(path)).await?;

        let Some(Value::Array(rights)) = records.first().and_then(|record| record.get("rights")) else {
            return Ok(Vec::new());
        };

        rights
            .iter()
            .filter_map(Value::as_object)
            .map(|right| {
                let id = field(right, "id").as_i64().ok_or_else(|| {
                    OrnithoError::UnexpectedResponse("right without numeric id".to_string())
                })?;
                Ok(Self {
                    id,
                    name: field(right, "name").as_str().unwrap_or_default().to_string(),
                    comment: field(right, "comment").as_str().unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}
