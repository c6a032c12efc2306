//! Loading template dictionaries from a directory of `<language>.json` files.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use thiserror::Error;

use mapsync_core::{LocaleCatalog, LocaleError, TemplateDictionary};
use mapsync_fs::{JSON_EXTENSION, files_with_extension, read_to_string};

/// Errors raised by [`load_locale_catalog`].
#[derive(Debug, Error)]
pub enum LocaleLoadError {
    /// The directory could not be listed.
    #[error("failed to list locale directory {path}: {source}")]
    ListDirectory {
        /// Directory that was scanned.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A dictionary file could not be read.
    #[error("failed to read locale file {path}: {source}")]
    Read {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A dictionary file was not a valid template dictionary.
    #[error("failed to parse locale file {path}: {source}")]
    Parse {
        /// File that failed.
        path: Utf8PathBuf,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The catalogue could not be assembled.
    #[error(transparent)]
    Catalog(#[from] LocaleError),
}

/// Read every `<language>.json` in `dir` into a [`LocaleCatalog`].
///
/// The file stem is the language code. Fails when any file is unreadable or
/// when `default_language` has no dictionary.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use mapsync_core::LocaleResolver;
/// use mapsync_data::load_locale_catalog;
///
/// let catalog = load_locale_catalog(Utf8Path::new("locales"), "fr")?;
/// let dictionary = catalog.resolve(Some("fr-CA"));
/// println!("{}", dictionary.changeset.comment);
/// # Ok::<(), mapsync_data::LocaleLoadError>(())
/// ```
pub fn load_locale_catalog(
    dir: &Utf8Path,
    default_language: &str,
) -> Result<LocaleCatalog, LocaleLoadError> {
    let files =
        files_with_extension(dir, JSON_EXTENSION).map_err(|source| LocaleLoadError::ListDirectory {
            path: dir.to_owned(),
            source,
        })?;

    let mut dictionaries = Vec::with_capacity(files.len());
    for (language, path) in files {
        let raw = read_to_string(&path).map_err(|source| LocaleLoadError::Read {
            path: path.clone(),
            source,
        })?;
        let dictionary: TemplateDictionary = serde_json::from_str(&raw)
            .map_err(|source| LocaleLoadError::Parse { path, source })?;
        dictionaries.push((language, dictionary));
    }
    debug!("Loaded {} locale dictionaries from {dir}", dictionaries.len());
    Ok(LocaleCatalog::new(default_language, dictionaries)?)
}
