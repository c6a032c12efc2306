//! Tag reconciliation between a remote element and a contribution.
//!
//! Reconciliation is a pure function. It decides whether an upload is needed
//! at all, which keeps unchanged elements from opening a changeset.

use crate::{DELETE_SENTINEL, Element, Tags};

/// Outcome of reconciling one contribution against a remote tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Tag set to upload: the current tags with deletions and writes applied.
    pub tags: Tags,
    /// Whether `tags` differs from the remote element's current tags.
    pub changed: bool,
    /// Keys requested for deletion with the sentinel value.
    pub deleted: Vec<String>,
    /// Keys requested with a concrete value.
    pub written: Vec<String>,
}

impl Reconciliation {
    /// Apply the written keys and deletions to `element`.
    ///
    /// For the element `current` was read from, the result carries exactly
    /// [`Reconciliation::tags`].
    #[must_use]
    pub fn apply_to(&self, element: Element) -> Element {
        let writes: Tags = self
            .written
            .iter()
            .filter_map(|key| self.tags.get_key_value(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.deleted
            .iter()
            .fold(element.with_tags(&writes), |updated, key| {
                updated.without_tag(key)
            })
    }
}

/// Compute the tag delta for one contribution.
///
/// Keys whose requested value is [`DELETE_SENTINEL`] are removed and never
/// written. `changed` compares every key and value of the result against
/// `current`; an absent or empty request is never a change.
///
/// # Examples
///
/// ```
/// use mapsync_core::{Tags, reconcile};
///
/// let current = Tags::from([("shop".into(), "bakery".into())]);
/// let same = reconcile(&current, Some(&current));
/// assert!(!same.changed);
///
/// let request = Tags::from([("shop".into(), "null".into())]);
/// let outcome = reconcile(&current, Some(&request));
/// assert!(outcome.changed);
/// assert!(outcome.tags.is_empty());
/// ```
#[must_use]
pub fn reconcile(current: &Tags, requested: Option<&Tags>) -> Reconciliation {
    let Some(requested) = requested.filter(|tags| !tags.is_empty()) else {
        return Reconciliation {
            tags: current.clone(),
            changed: false,
            deleted: Vec::new(),
            written: Vec::new(),
        };
    };

    let mut tags = current.clone();
    let mut deleted = Vec::new();
    let mut written = Vec::new();
    for (key, value) in requested {
        if value == DELETE_SENTINEL {
            tags.remove(key);
            deleted.push(key.clone());
        } else {
            tags.insert(key.clone(), value.clone());
            written.push(key.clone());
        }
    }

    let changed = tags != *current;
    Reconciliation {
        tags,
        changed,
        deleted,
        written,
    }
}
