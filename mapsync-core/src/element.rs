//! Remote map elements as fetched from, and written back to, the mapping service.
//!
//! The tag transforms are pure: each returns a new [`Element`] and leaves the
//! geometry untouched so an element can be uploaded exactly as fetched apart
//! from its tags.

use chrono::{DateTime, Utc};

use crate::{ElementKind, ElementRef, Tags};

/// Member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    /// Referenced element.
    pub member: ElementRef,
    /// Role of the member within the relation, possibly empty.
    pub role: String,
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBody {
    /// Node coordinates, WGS84.
    Node {
        /// Latitude.
        lat: f64,
        /// Longitude.
        lon: f64,
    },
    /// Ordered node references of a way.
    Way {
        /// Node identifiers.
        nodes: Vec<u64>,
    },
    /// Relation members in order.
    Relation {
        /// Members.
        members: Vec<RelationMember>,
    },
}

impl ElementBody {
    /// Element kind implied by the payload.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Node { .. } => ElementKind::Node,
            Self::Way { .. } => ElementKind::Way,
            Self::Relation { .. } => ElementKind::Relation,
        }
    }
}

/// A remote map entity carrying a tag set.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Remote address.
    pub reference: ElementRef,
    /// Version used for optimistic locking on upload.
    pub version: u64,
    /// Current tags.
    pub tags: Tags,
    /// Last modification time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Changeset of the last modification.
    pub changeset: Option<u64>,
    /// Geometry and membership.
    pub body: ElementBody,
}

impl Element {
    /// Current tag set.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Set every key in `tags`, keeping keys not mentioned.
    #[must_use]
    pub fn with_tags(mut self, tags: &Tags) -> Self {
        self.tags
            .extend(tags.iter().map(|(key, value)| (key.clone(), value.clone())));
        self
    }

    /// Remove `key` if present.
    #[must_use]
    pub fn without_tag(mut self, key: &str) -> Self {
        self.tags.remove(key);
        self
    }

    /// Stamp the modification time.
    #[must_use]
    pub fn touched(mut self, now: DateTime<Utc>) -> Self {
        self.timestamp = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cafe() -> Element {
        Element {
            reference: ElementRef::new(ElementKind::Node, 5),
            version: 3,
            tags: Tags::from([
                ("amenity".into(), "cafe".into()),
                ("name".into(), "Chez Léon".into()),
            ]),
            timestamp: None,
            changeset: Some(10),
            body: ElementBody::Node { lat: 48.1, lon: -1.6 },
        }
    }

    #[rstest]
    fn with_tags_merges_without_dropping_existing_keys(cafe: Element) {
        let updated = cafe.with_tags(&Tags::from([("wheelchair".into(), "yes".into())]));
        assert_eq!(updated.tags().len(), 3);
        assert_eq!(updated.tags().get("amenity").map(String::as_str), Some("cafe"));
        assert_eq!(updated.tags().get("wheelchair").map(String::as_str), Some("yes"));
    }

    #[rstest]
    fn without_tag_ignores_missing_keys(cafe: Element) {
        let original = cafe.tags().clone();
        let unchanged = cafe.without_tag("shop");
        assert_eq!(unchanged.tags(), &original);
        let trimmed = unchanged.without_tag("name");
        assert!(!trimmed.tags().contains_key("name"));
    }

    #[rstest]
    fn touched_keeps_geometry(cafe: Element) {
        let body = cafe.body.clone();
        let now = Utc::now();
        let stamped = cafe.touched(now);
        assert_eq!(stamped.timestamp, Some(now));
        assert_eq!(stamped.body, body);
        assert_eq!(stamped.body.kind(), ElementKind::Node);
    }
}
