//! OsmChange-style XML request bodies for changeset and element writes.

use mapsync_core::{ChangesetId, ChangesetMetadata, Element, ElementBody, Tags};

/// Escape text for use inside a double-quoted XML attribute.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Body of `PUT /api/0.6/changeset/create`.
pub fn changeset_document(metadata: &ChangesetMetadata) -> String {
    let mut tags = Tags::new();
    tags.insert("created_by".to_owned(), metadata.editor.clone());
    tags.insert("comment".to_owned(), metadata.comment.clone());
    if let Some(description) = &metadata.description {
        tags.insert("description".to_owned(), description.clone());
    }
    let mut xml = String::from("<osm><changeset>");
    push_tags(&mut xml, &tags);
    xml.push_str("</changeset></osm>");
    xml
}

/// Body of `PUT /api/0.6/{kind}/{id}` uploading `element` under `changeset`.
pub fn element_document(element: &Element, changeset: ChangesetId) -> String {
    let kind = element.reference.kind.as_str();
    let mut xml = format!(
        "<osm><{kind} id=\"{}\" changeset=\"{changeset}\" version=\"{}\"",
        element.reference.id, element.version
    );
    if let Some(timestamp) = element.timestamp {
        xml.push_str(&format!(
            " timestamp=\"{}\"",
            timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));
    }
    if let ElementBody::Node { lat, lon } = element.body {
        xml.push_str(&format!(" lat=\"{lat}\" lon=\"{lon}\""));
    }
    xml.push('>');

    match &element.body {
        ElementBody::Node { .. } => {}
        ElementBody::Way { nodes } => {
            for node in nodes {
                xml.push_str(&format!("<nd ref=\"{node}\"/>"));
            }
        }
        ElementBody::Relation { members } => {
            for member in members {
                xml.push_str(&format!(
                    "<member type=\"{}\" ref=\"{}\" role=\"{}\"/>",
                    member.member.kind,
                    member.member.id,
                    escape(&member.role)
                ));
            }
        }
    }
    push_tags(&mut xml, &element.tags);
    xml.push_str(&format!("</{kind}></osm>"));
    xml
}

fn push_tags(xml: &mut String, tags: &Tags) {
    for (key, value) in tags {
        xml.push_str(&format!(
            "<tag k=\"{}\" v=\"{}\"/>",
            escape(key),
            escape(value)
        ));
    }
}
