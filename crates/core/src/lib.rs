//! # laybridge core
//!
//! Client-side core of the lay-term → clinical terminology lookup tool.
//!
//! This crate contains the pure logic between the backend's JSON responses and
//! whatever surface presents them:
//! - normalising heterogeneous lookup-response shapes into one [`CanonicalResult`]
//! - merging and deduplicating SNOMED candidate options across response sections
//! - the selection state machine separating a transient preview choice from the
//!   persisted saved code
//! - deriving the exportable FHIR-shaped coded concept
//!
//! **No transport concerns**: HTTP lives in `api-client`; everything here is a
//! pure function or object over in-memory data.

pub mod concept;
pub mod config;
pub mod normalize;
pub mod options;
pub mod session;

pub use concept::build_codeable_concept;
pub use config::LookupParams;
pub use normalize::{normalize, CanonicalResult, TechnicalBlock};
pub use options::{merge_options, SnomedOption};
pub use session::{LoadedSession, PreviewSelection, SaveStatus, Session, SessionError};
