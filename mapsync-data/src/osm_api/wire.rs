//! OSM API v0.6 JSON response types for element reads.
//!
//! See: <https://wiki.openstreetmap.org/wiki/API_v0.6#Read:_GET_/api/0.6/[node|way|relation]/#id>

use chrono::{DateTime, Utc};
use mapsync_core::{Element, ElementBody, ElementKind, ElementRef, RelationMember, Tags};
use serde::Deserialize;

/// Body of `GET /api/0.6/{kind}/{id}.json`.
#[derive(Debug, Deserialize)]
pub struct ElementsResponse {
    /// Elements in the response; a single-element read returns one.
    pub elements: Vec<WireElement>,
}

/// One element as serialised by the OSM API.
#[derive(Debug, Deserialize)]
pub struct WireElement {
    /// `node`, `way` or `relation`.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Element identifier.
    pub id: u64,
    /// Current version.
    pub version: u64,
    /// Last modification time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Changeset of the last modification.
    pub changeset: Option<u64>,
    /// Node latitude.
    pub lat: Option<f64>,
    /// Node longitude.
    pub lon: Option<f64>,
    /// Way node references.
    #[serde(default)]
    pub nodes: Vec<u64>,
    /// Relation members.
    #[serde(default)]
    pub members: Vec<WireMember>,
    /// Tags; omitted by the API when empty.
    #[serde(default)]
    pub tags: Tags,
}

/// Relation member as serialised by the OSM API.
#[derive(Debug, Deserialize)]
pub struct WireMember {
    /// Member kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Member identifier.
    #[serde(rename = "ref")]
    pub id: u64,
    /// Member role.
    #[serde(default)]
    pub role: String,
}

impl ElementsResponse {
    /// The element matching `wanted`, converted to the domain type.
    pub fn into_element(self, wanted: ElementRef) -> Result<Element, String> {
        self.elements
            .into_iter()
            .find(|element| element.kind == wanted.kind && element.id == wanted.id)
            .ok_or_else(|| format!("response does not contain {wanted}"))?
            .into_element()
    }
}

impl WireElement {
    fn into_element(self) -> Result<Element, String> {
        let reference = ElementRef::new(self.kind, self.id);
        let body = match self.kind {
            ElementKind::Node => match (self.lat, self.lon) {
                (Some(lat), Some(lon)) => ElementBody::Node { lat, lon },
                _ => return Err(format!("{reference} has no coordinates")),
            },
            ElementKind::Way => ElementBody::Way { nodes: self.nodes },
            ElementKind::Relation => ElementBody::Relation {
                members: self
                    .members
                    .into_iter()
                    .map(|member| RelationMember {
                        member: ElementRef::new(member.kind, member.id),
                        role: member.role,
                    })
                    .collect(),
            },
        };
        Ok(Element {
            reference,
            version: self.version,
            tags: self.tags,
            timestamp: self.timestamp,
            changeset: self.changeset,
            body,
        })
    }
}
