//! OpenStreetMap API v0.6 adapter.
//!
//! [`HttpMappingService`] implements `mapsync_core::MappingService` over
//! `reqwest`. Reads use the JSON representation; writes send the XML bodies
//! the API expects.

mod client;
mod wire;
mod xml;

pub use client::{
    ClientBuildError, Credentials, DEFAULT_USER_AGENT, HttpMappingService, HttpMappingServiceConfig,
};
pub use xml::{changeset_document, element_document, escape};
