//! Pending local edit intents and the identifiers that address them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Free-form OpenStreetMap key/value annotations.
///
/// A `BTreeMap` keeps rendering and upload output deterministic; equality is
/// independent of insertion order.
pub type Tags = BTreeMap<String, String>;

/// Tag value requesting removal of the key on the remote element.
pub const DELETE_SENTINEL: &str = "null";

/// Textual `osmid` marking a contribution about an element that does not exist yet.
pub const NEW_ELEMENT_SENTINEL: &str = "new";

/// Local identifier of a contribution, unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContributionId(pub i64);

impl fmt::Display for ContributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ContributionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Kind of remote map entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of members with roles.
    Relation,
}

impl ElementKind {
    /// Path segment used by the OSM API for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = OsmIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(OsmIdError::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Address of an existing remote element, e.g. `node/123`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// Element kind.
    pub kind: ElementKind,
    /// Remote identifier, unique per kind.
    pub id: u64,
}

impl ElementRef {
    /// Construct a reference from its parts.
    #[must_use]
    pub const fn new(kind: ElementKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Remote element targeted by a contribution.
///
/// # Examples
///
/// ```
/// use mapsync_core::{ElementKind, ElementRef, OsmId};
///
/// let id: OsmId = "way/42".parse().expect("valid osmid");
/// assert_eq!(id, OsmId::Existing(ElementRef::new(ElementKind::Way, 42)));
/// assert_eq!("new".parse::<OsmId>(), Ok(OsmId::New));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsmId {
    /// The contribution describes an element that is not mapped yet.
    New,
    /// The contribution targets an element that already exists remotely.
    Existing(ElementRef),
}

impl OsmId {
    /// Return the element reference unless this is the "new" sentinel.
    #[must_use]
    pub const fn element(&self) -> Option<ElementRef> {
        match self {
            Self::New => None,
            Self::Existing(element) => Some(*element),
        }
    }
}

impl fmt::Display for OsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str(NEW_ELEMENT_SENTINEL),
            Self::Existing(element) => element.fmt(f),
        }
    }
}

/// Errors returned when parsing an [`OsmId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OsmIdError {
    /// The value did not have the `<kind>/<id>` shape.
    #[error("osmid {value:?} is not of the form <kind>/<id>")]
    Malformed {
        /// Offending input.
        value: String,
    },
    /// The kind segment was not node, way or relation.
    #[error("unknown element kind {kind:?}")]
    UnknownKind {
        /// Offending kind segment.
        kind: String,
    },
    /// The identifier segment was not a positive integer.
    #[error("invalid element id {id:?}")]
    InvalidId {
        /// Offending id segment.
        id: String,
    },
}

impl FromStr for OsmId {
    type Err = OsmIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed == NEW_ELEMENT_SENTINEL {
            return Ok(Self::New);
        }
        let (kind, id) = trimmed
            .split_once('/')
            .ok_or_else(|| OsmIdError::Malformed {
                value: value.to_owned(),
            })?;
        let kind = kind.parse::<ElementKind>()?;
        let id = id
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| OsmIdError::InvalidId { id: id.to_owned() })?;
        Ok(Self::Existing(ElementRef::new(kind, id)))
    }
}

/// One pending local edit intent.
///
/// Element-edit contributions drive tag reconciliation through `tags`; note
/// contributions use the descriptive fields for rendering. Every descriptive
/// field is optional so both shapes share one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Local identifier.
    pub id: ContributionId,
    /// Remote element, or [`OsmId::New`].
    pub osmid: OsmId,
    /// Requested tag values; [`DELETE_SENTINEL`] values delete the key.
    pub tags: Option<Tags>,
    /// Free-text details supplied by the contributor.
    pub details: Option<String>,
    /// Status code of the place, e.g. `open` or `closed`.
    pub status: Option<String>,
    /// Opening hours in OSM syntax.
    pub opening_hours: Option<String>,
    /// Name of the place.
    pub name: Option<String>,
    /// Latitude, WGS84.
    pub lat: Option<f64>,
    /// Longitude, WGS84.
    pub lon: Option<f64>,
    /// Contributor's language code.
    pub language: Option<String>,
    /// Country code used for hashtags.
    pub country: Option<String>,
}

impl Contribution {
    /// Construct a contribution with no optional fields set.
    #[must_use]
    pub const fn new(id: ContributionId, osmid: OsmId) -> Self {
        Self {
            id,
            osmid,
            tags: None,
            details: None,
            status: None,
            opening_hours: None,
            name: None,
            lat: None,
            lon: None,
            language: None,
            country: None,
        }
    }

    /// Set the requested tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the coordinates.
    #[must_use]
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Set the place name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Coordinates when both are present.
    #[must_use]
    pub fn location(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}
