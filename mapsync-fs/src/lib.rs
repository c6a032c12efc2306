//! Capability-based filesystem helpers for the database and locale files.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// File extension of locale dictionaries.
pub const JSON_EXTENSION: &str = "json";

/// Open `path` as a directory using ambient authority.
pub fn open_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    fs_utf8::Dir::open_ambient_dir(path, ambient_authority())
}

/// Read a whole UTF-8 file.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let parent = path.parent().filter(|p| !p.as_str().is_empty());
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} has no file name")))?;
    open_dir(parent.unwrap_or_else(|| Utf8Path::new(".")))?.read_to_string(name)
}

/// Create every missing ancestor directory of the file at `path`.
///
/// Absolute paths are split at their root so `cap-std` only ever sees a
/// relative suffix.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (root, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    open_dir(&root)?.create_dir_all(&relative)
}

/// Files in `dir` with the given extension, as `(stem, path)` sorted by stem.
///
/// Subdirectories and other files are ignored.
pub fn files_with_extension(
    dir: &Utf8Path,
    extension: &str,
) -> io::Result<Vec<(String, Utf8PathBuf)>> {
    let handle = open_dir(dir)?;
    let mut files = Vec::new();
    for entry in handle.entries()? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = Utf8PathBuf::from(entry.file_name()?);
        if name.extension() != Some(extension) {
            continue;
        }
        if let Some(stem) = name.file_stem() {
            files.push((stem.to_owned(), dir.join(&name)));
        }
    }
    files.sort();
    Ok(files)
}

fn split_root(path: &Utf8Path) -> io::Result<(Utf8PathBuf, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let root = match std_path.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => return Ok((Utf8PathBuf::from("."), path.to_owned())),
    };
    let relative = path
        .strip_prefix(&root)
        .map_err(|_| io::Error::other(format!("cannot strip {root} from {path}")))?;
    Ok((root, relative.to_owned()))
}
