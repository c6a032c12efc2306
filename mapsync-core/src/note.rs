//! Plain-text rendering of map notes.

use crate::{Contribution, DELETE_SENTINEL, NoteTemplates, OsmId};

/// Placeholder in the header replaced by the country hashtag.
pub const HASHTAG_COUNTRY_PLACEHOLDER: &str = "{HASHTAG_COUNTRY}";

/// Placeholder in the hashtag template replaced by the country code.
pub const COUNTRY_PLACEHOLDER: &str = "{COUNTRY}";

/// Render the note body for `contribution`.
///
/// Optional lines (element link, details, status, opening hours, extra tags)
/// are omitted when either the contribution field or its label is missing,
/// and leave no blank line behind: the body always has exactly one blank
/// line after the header and one before the footer.
/// The link is never rendered for [`OsmId::New`].
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use mapsync_core::{Contribution, ContributionId, NoteTemplates, OsmId, render_note};
///
/// let templates = NoteTemplates {
///     header: "New place".into(),
///     name: "Name:".into(),
///     unknown: "unknown".into(),
///     url: "Link:".into(),
///     details: "Details:".into(),
///     footer: "Thanks".into(),
///     country_hashtag: None,
///     status: None,
///     opening_hours: None,
///     statuses: BTreeMap::new(),
/// };
/// let note = Contribution::new(ContributionId(1), OsmId::New).with_name("Bakery");
/// let text = render_note(&templates, &note, "https://www.openstreetmap.org");
/// assert_eq!(text, "New place\n\nName: Bakery\n\nThanks");
/// ```
#[must_use]
pub fn render_note(
    templates: &NoteTemplates,
    contribution: &Contribution,
    element_url_base: &str,
) -> String {
    let mut lines = vec![render_header(templates, contribution), String::new()];

    let name = contribution
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&templates.unknown);
    lines.push(format!("{} {name}", templates.name));

    if let OsmId::Existing(element) = contribution.osmid {
        lines.push(format!(
            "{} {}/{element}",
            templates.url,
            element_url_base.trim_end_matches('/')
        ));
    }

    if let Some(details) = non_blank(contribution.details.as_deref()) {
        lines.push(format!("{} {details}", templates.details));
    }

    if let (Some(label), Some(status)) = (
        templates.status.as_deref(),
        non_blank(contribution.status.as_deref()),
    ) {
        let status = templates
            .statuses
            .get(status)
            .map_or(status, String::as_str);
        lines.push(format!("{label} {status}"));
    }

    if let (Some(label), Some(hours)) = (
        templates.opening_hours.as_deref(),
        non_blank(contribution.opening_hours.as_deref()),
    ) {
        lines.push(format!("{label} {hours}"));
    }

    if let Some(tags) = &contribution.tags {
        lines.extend(
            tags.iter()
                .filter(|(_, value)| !value.is_empty() && value.as_str() != DELETE_SENTINEL)
                .map(|(key, value)| format!("{key}={value}")),
        );
    }

    lines.push(String::new());
    lines.push(templates.footer.clone());
    lines.join("\n")
}

fn render_header(templates: &NoteTemplates, contribution: &Contribution) -> String {
    let hashtag = match (
        templates.country_hashtag.as_deref(),
        non_blank(contribution.country.as_deref()),
    ) {
        (Some(template), Some(country)) => template.replace(COUNTRY_PLACEHOLDER, country),
        _ => String::new(),
    };
    templates
        .header
        .replace(HASHTAG_COUNTRY_PLACEHOLDER, &hashtag)
        .trim()
        .to_owned()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
