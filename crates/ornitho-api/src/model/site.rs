use async_trait::async_trait;

use crate::client::{Fetched, OrnithoClient};
use crate::codec::Params;
use crate::entity::{EntityCore, Resource};
use crate::error::{OrnithoError, Result};
use crate::record::field;
use crate::transport::Request;

/// Base map of a site export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLayer {
    Bkg,
    TopoPlusOpen,
    Osm2014,
    OsmLive,
}

impl MapLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bkg => "BKG",
            Self::TopoPlusOpen => "TOPO_PLUS_OPEN",
            Self::Osm2014 => "OSM2014",
            Self::OsmLive => "OSMLIVE",
        }
    }
}

/// Rendering switches of [`Site::pdf`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SitePdf {
    pub map_layer: Option<MapLayer>,
    pub greyscale: bool,
    pub greyline: bool,
    pub alpha: bool,
    pub boundary: bool,
}

impl SitePdf {
    fn params(&self, id: i64) -> Params {
        let mut params = Params::new().with("id", id);
        if let Some(layer) = self.map_layer {
            params.insert("map_layer", layer.as_str());
        }
        let switches = [
            ("greyscale", self.greyscale),
            ("greyline", self.greyline),
            ("alpha", self.alpha),
            ("boundary", self.boundary),
        ];
        for (name, enabled) in switches {
            if enabled {
                params.insert(name, 1);
            }
        }
        params
    }
}

/// A survey site of a [`Protocol`](super::Protocol)
///
/// Sites are only reachable through their protocol and cannot be fetched alone.
#[derive(Debug, Clone)]
pub struct Site {
    core: EntityCore,
}

#[async_trait]
impl Resource for Site {
    const ENDPOINT: &'static str = "protocol/sites";
    const KIND: &'static str = "Site";

    fn from_core(core: EntityCore) -> Self {
        Self { core }
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    async fn refresh(&mut self, _client: &OrnithoClient, _short_version: bool, _retries: u32) -> Result<()> {
        Err(OrnithoError::Unsupported(
            "sites are loaded through Protocol::sites".to_string(),
        ))
    }
}

impl Site {
    pub fn id_universal(&self) -> Option<&str> {
        field(self.record(), "id_universal").as_str()
    }

    pub fn custom_name(&self) -> Option<&str> {
        field(self.record(), "custom_name").as_str()
    }

    pub fn reference_locality(&self) -> Option<&str> {
        field(self.record(), "reference_locality").as_str()
    }

    /// Map of the site as a PDF document
    pub async fn pdf(&self, client: &OrnithoClient, options: SitePdf) -> Result<Vec<u8>> {
        let id = self
            .require_id()?
            .as_int()
            .ok_or_else(|| OrnithoError::InvalidIdentifier(format!("{:?}", self.id())))?;

        let request = Request::get("protocol/site_pdf").params(options.params(id));
        match client.fetch(request).await? {
            (Fetched::Pdf(bytes), _) => Ok(bytes),
            _ => Err(OrnithoError::UnexpectedResponse(
                "site export did not return a PDF".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, json_response, response};
    use serde_json::json;

    #[tokio::test]
    async fn test_pdf_with_switches() {
        let (client, backend) = client(vec![response(200, Some("application/pdf"), b"%PDF-1.4".to_vec())]);
        let options = SitePdf {
            map_layer: Some(MapLayer::TopoPlusOpen),
            greyscale: true,
            boundary: true,
            ..SitePdf::default()
        };
        let pdf = Site::with_id(42).pdf(&client, options).await.unwrap();

        assert_eq!(pdf, b"%PDF-1.4".to_vec());
        let request = backend.last_request();
        assert_eq!(request.url, "https://ornitho.test/api/protocol/site_pdf");
        assert_eq!(request.param("id"), Some("42"));
        assert_eq!(request.param("map_layer"), Some("TOPO_PLUS_OPEN"));
        assert_eq!(request.param("greyscale"), Some("1"));
        assert_eq!(request.param("boundary"), Some("1"));
        assert_eq!(request.param("greyline"), None);
        assert_eq!(request.param("alpha"), None);
    }

    #[tokio::test]
    async fn test_pdf_rejects_json() {
        let (client, _) = client(vec![json_response(json!({"error": "no map"}))]);
        let err = Site::with_id(42).pdf(&client, SitePdf::default()).await.unwrap_err();
        assert!(matches!(err, OrnithoError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_refresh_is_unsupported() {
        let (client, backend) = client(vec![]);
        let err = Site::get(&client, 42, false).await.unwrap_err();
        assert!(matches!(err, OrnithoError::Unsupported(_)));
        assert_eq!(backend.calls(), 0);
    }
}
