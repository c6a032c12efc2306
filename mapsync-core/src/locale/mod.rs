//! Localised text templates for notes and changesets.
//!
//! A [`LocaleCatalog`] holds every dictionary up front. Resolution is a plain
//! lookup with a deterministic fallback chain: exact language, then primary
//! subtag, then the catalogue's default language.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::ChangesetMetadata;

/// Templates used when rendering a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct NoteTemplates {
    /// First line; `{HASHTAG_COUNTRY}` is replaced by the country hashtag.
    pub header: String,
    /// Label preceding the place name.
    pub name: String,
    /// Placeholder when the place has no name.
    pub unknown: String,
    /// Label preceding the element link.
    pub url: String,
    /// Label preceding contributor details.
    pub details: String,
    /// Closing line.
    pub footer: String,
    /// Hashtag template; `{COUNTRY}` is replaced by the country code.
    #[cfg_attr(feature = "serde", serde(default))]
    pub country_hashtag: Option<String>,
    /// Label preceding the place status.
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<String>,
    /// Label preceding the opening hours.
    #[cfg_attr(feature = "serde", serde(default))]
    pub opening_hours: Option<String>,
    /// Human-readable names of status codes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub statuses: BTreeMap<String, String>,
}

/// Metadata templates for changesets.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ChangesetTemplates {
    /// Editor name recorded as `created_by`.
    pub editor: String,
    /// Changeset comment.
    pub comment: String,
    /// Optional longer description.
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
}

impl ChangesetTemplates {
    /// Metadata for a changeset opened with these templates.
    #[must_use]
    pub fn metadata(&self) -> ChangesetMetadata {
        ChangesetMetadata {
            editor: self.editor.clone(),
            comment: self.comment.clone(),
            description: self
                .description
                .clone()
                .filter(|description| !description.trim().is_empty()),
        }
    }
}

/// All templates for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct TemplateDictionary {
    /// Note templates.
    pub note: NoteTemplates,
    /// Changeset templates.
    pub changeset: ChangesetTemplates,
}

/// Errors raised by [`LocaleCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    /// No dictionary exists for the requested language.
    #[error("no dictionary for language {language:?}")]
    NotFound {
        /// Normalised language code.
        language: String,
    },
    /// The catalogue was built without its default language.
    #[error("default language {language:?} has no dictionary")]
    MissingDefault {
        /// Normalised language code.
        language: String,
    },
}

/// Resolve a dictionary for a contribution's language.
pub trait LocaleResolver {
    /// Dictionary for `language`, falling back to the default language.
    fn resolve(&self, language: Option<&str>) -> &TemplateDictionary;
}

/// Preloaded mapping of language code to dictionary.
#[derive(Debug, Clone)]
pub struct LocaleCatalog {
    default_language: String,
    default: TemplateDictionary,
    dictionaries: HashMap<String, TemplateDictionary>,
}

impl LocaleCatalog {
    /// Build a catalogue, requiring a dictionary for `default_language`.
    ///
    /// Language codes are normalised to lowercase with `-` separators.
    pub fn new<I>(default_language: &str, dictionaries: I) -> Result<Self, LocaleError>
    where
        I: IntoIterator<Item = (String, TemplateDictionary)>,
    {
        let dictionaries: HashMap<String, TemplateDictionary> = dictionaries
            .into_iter()
            .map(|(language, dictionary)| (normalise(&language), dictionary))
            .collect();
        let default_language = normalise(default_language);
        let Some(default) = dictionaries.get(&default_language).cloned() else {
            return Err(LocaleError::MissingDefault {
                language: default_language,
            });
        };
        Ok(Self {
            default_language,
            default,
            dictionaries,
        })
    }

    /// Normalised default language.
    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Languages with a dictionary, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.dictionaries.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Exact lookup without fallback.
    pub fn lookup(&self, language: &str) -> Result<&TemplateDictionary, LocaleError> {
        let language = normalise(language);
        self.dictionaries
            .get(&language)
            .ok_or(LocaleError::NotFound { language })
    }

    const fn default_dictionary(&self) -> &TemplateDictionary {
        &self.default
    }
}

impl LocaleResolver for LocaleCatalog {
    fn resolve(&self, language: Option<&str>) -> &TemplateDictionary {
        let Some(language) = language.map(str::trim).filter(|code| !code.is_empty()) else {
            return self.default_dictionary();
        };
        self.lookup(language)
            .or_else(|_| {
                let primary = language.split(['-', '_']).next().unwrap_or(language);
                self.lookup(primary)
            })
            .unwrap_or_else(|_| self.default_dictionary())
    }
}

fn normalise(language: &str) -> String {
    language.trim().to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn dictionary(editor: &str) -> TemplateDictionary {
        TemplateDictionary {
            note: NoteTemplates {
                header: "Header".into(),
                name: "Name:".into(),
                unknown: "unknown".into(),
                url: "URL:".into(),
                details: "Details:".into(),
                footer: "Footer".into(),
                country_hashtag: None,
                status: None,
                opening_hours: None,
                statuses: BTreeMap::new(),
            },
            changeset: ChangesetTemplates {
                editor: editor.into(),
                comment: "comment".into(),
                description: None,
            },
        }
    }

    #[fixture]
    fn catalog() -> LocaleCatalog {
        LocaleCatalog::new(
            "fr",
            [
                ("fr".to_owned(), dictionary("fr")),
                ("en".to_owned(), dictionary("en")),
                ("pt_BR".to_owned(), dictionary("pt-br")),
            ],
        )
        .expect("default present")
    }

    #[rstest]
    #[case(Some("en"), "en")]
    #[case(Some("EN"), "en")]
    #[case(Some("en-GB"), "en")]
    #[case(Some("pt-BR"), "pt-br")]
    #[case(Some("de"), "fr")]
    #[case(Some(""), "fr")]
    #[case(None, "fr")]
    fn resolves_with_fallback(
        catalog: LocaleCatalog,
        #[case] language: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(catalog.resolve(language).changeset.editor, expected);
    }

    #[rstest]
    fn lookup_reports_missing_language(catalog: LocaleCatalog) {
        let err = catalog.lookup("de").expect_err("no german dictionary");
        assert_eq!(
            err,
            LocaleError::NotFound {
                language: "de".into()
            }
        );
    }

    #[rstest]
    fn requires_default_dictionary() {
        let err = LocaleCatalog::new("fr", [("en".to_owned(), dictionary("en"))])
            .expect_err("default missing");
        assert!(matches!(err, LocaleError::MissingDefault { .. }));
    }

    #[rstest]
    fn blank_description_is_omitted() {
        let mut templates = dictionary("en").changeset;
        templates.description = Some("  ".into());
        assert_eq!(templates.metadata().description, None);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn deserialises_minimal_dictionary() {
        let json = r#"{
            "note": {
                "header": "New note {HASHTAG_COUNTRY}",
                "name": "Name:",
                "unknown": "unknown",
                "url": "Link:",
                "details": "Details:",
                "footer": "Sent by mapsync"
            },
            "changeset": { "editor": "mapsync", "comment": "Update" }
        }"#;
        let parsed: TemplateDictionary = serde_json::from_str(json).expect("valid dictionary");
        assert!(parsed.note.statuses.is_empty());
        assert_eq!(parsed.changeset.description, None);
    }
}
