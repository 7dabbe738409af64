//! Rust client for the Biolovision ornitho API
//!
//! ornitho portals (ornitho.de, ornitho.ch, faune-france.org, ...) expose
//! observations, forms, species and places through a JSON API signed with
//! two-legged OAuth 1.0. This crate covers the request pipeline (signing,
//! retries, paging, response decoding) and typed entities hydrated lazily
//! from the raw records the service returns.
//!
//! # Example
//!
//! ```no_run
//! use ornitho_api::{Config, ListQuery, Observation, OrnithoClient, Resource, Searchable};
//!
//! # async fn example() -> Result<(), ornitho_api::OrnithoError> {
//! let client = OrnithoClient::new(Config::new(
//!     "consumer-key",
//!     "consumer-secret",
//!     "birder@example.org",
//!     "password",
//!     "https://www.ornitho.de/api/",
//! )?);
//!
//! let query = ListQuery::new()
//!     .param("id_species", 94)
//!     .param("period_choice", "all");
//! for observation in Observation::search_all(&client, query).await? {
//!     println!("{:?} {:?}", observation.id(), observation.count());
//! }
//!
//! // Lazily completed on first access
//! let mut observer = ornitho_api::Observer::with_id(10156);
//! println!("{:?}", observer.name(&client).await?);
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - `observations` - list, search, create, update, delete, diff
//! - `observations/search` with `id_form` - checklists (forms)
//! - `observers`, `observers/current`, `observers/rights`
//! - `places`, `places/diff`, `local_admin_units`, `territorial_units`
//! - `species`, `families`, `taxo_groups`, `media`, `fields`, `entities`
//! - `protocol`, `protocol/sites`, `protocol/site_pdf`

mod cache;
mod capability;
mod client;
mod codec;
mod config;
mod entity;
mod envelope;
mod error;
pub mod model;
mod oauth;
mod record;
mod transport;

#[cfg(test)]
mod testing;

pub use cache::CachedBackend;
pub use capability::{Createable, Deletable, ListQuery, Listable, Searchable, Updateable};
pub use client::{Fetched, OrnithoClient};
pub use codec::{ParamValue, Params};
pub use config::Config;
pub use entity::{EntityCore, Resource};
pub use envelope::normalize;
pub use error::{HttpFailure, OrnithoError, Result};
pub use model::{
    Detail, DiffFilter, Entity, EstimationCode, Family, Field, FieldOption, Form, FormDraft,
    LocalAdminUnit, MapLayer, Media, ModificationType, Observation, ObservationDraft, Observer,
    Place, Precision, Protocol, Right, Site, SitePdf, Species, TaxonomicGroup, TerritorialUnit,
};
pub use oauth::OAuthSigner;
pub use record::{FieldValue, Identifier, RawRecord};
pub use transport::{HttpBackend, HttpRequest, HttpResponse, OAuthSession, Payload, Request, Transport};
