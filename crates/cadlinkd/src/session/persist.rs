//! Saving and loading documents as JSON files.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cadlink_config::EngineKind;

use super::document::Document;
use super::material::Material;

const FORMAT_TAG: &str = "cadlink-document";
const FORMAT_VERSION: u32 = 1;

/// On-disk representation of one document and the materials it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    format: String,
    version: u32,
    /// Engine that wrote the file.
    pub engine: EngineKind,
    /// Saved document.
    pub document: Document,
    /// Materials referenced by the document's objects.
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl DocumentFile {
    /// Wraps a document for saving.
    #[must_use]
    pub fn new(engine: EngineKind, document: Document, materials: Vec<Material>) -> Self {
        Self {
            format: FORMAT_TAG.to_owned(),
            version: FORMAT_VERSION,
            engine,
            document,
            materials,
        }
    }
}

/// Failures while reading or writing document files.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the file failed.
    #[error("failed to access '{path}': {source}")]
    Io {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON for a document.
    #[error("'{path}' is not a cadlink document: {source}")]
    Format {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The file was written by a newer or foreign format.
    #[error("'{path}' uses unsupported format {format} v{version}")]
    Unsupported {
        /// File path.
        path: Utf8PathBuf,
        /// Format tag found in the file.
        format: String,
        /// Version found in the file.
        version: u32,
    },
}

/// Writes a document file, creating parent directories.
///
/// # Errors
///
/// Returns [`PersistError::Io`] when the file cannot be written.
pub fn save(path: &Utf8Path, file: &DocumentFile) -> Result<u64, PersistError> {
    let io_error = |source| PersistError::Io {
        path: path.to_owned(),
        source,
    };
    let bytes = serde_json::to_vec_pretty(file).map_err(|source| PersistError::Format {
        path: path.to_owned(),
        source,
    })?;
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, &bytes).map_err(io_error)?;
    Ok(bytes.len() as u64)
}

/// Reads a document file.
///
/// # Errors
///
/// Returns [`PersistError::Io`] for unreadable files, [`PersistError::Format`]
/// for malformed content and [`PersistError::Unsupported`] for foreign
/// formats.
pub fn load(path: &Utf8Path) -> Result<DocumentFile, PersistError> {
    let bytes = fs::read(path).map_err(|source| PersistError::Io {
        path: path.to_owned(),
        source,
    })?;
    let file: DocumentFile =
        serde_json::from_slice(&bytes).map_err(|source| PersistError::Format {
            path: path.to_owned(),
            source,
        })?;
    if file.format != FORMAT_TAG || file.version > FORMAT_VERSION {
        return Err(PersistError::Unsupported {
            path: path.to_owned(),
            format: file.format,
            version: file.version,
        });
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::kernel::{Geometry, Placement};
    use crate::session::document::{ObjectKind, SceneObject};

    fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf8 temp path")
    }

    #[rstest]
    fn saved_documents_load_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = temp_path(&dir, "scenes/one.json");
        let mut document = Document::new("Scene");
        document.insert(SceneObject::new(
            "Cube",
            ObjectKind::Mesh,
            "Cube",
            Placement::at([1.0, 2.0, 3.0]),
            Geometry::marker(),
        ));
        let file = DocumentFile::new(EngineKind::Mesh, document, vec![Material::new("Red")]);

        save(&path, &file).expect("save");
        let loaded = load(&path).expect("load");

        assert_eq!(loaded, file);
    }

    #[rstest]
    fn foreign_json_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = temp_path(&dir, "other.json");
        fs::write(&path, br#"{"hello":"world"}"#).expect("write");
        assert!(matches!(load(&path), Err(PersistError::Format { .. })));
    }

    #[rstest]
    fn missing_files_report_io_errors() {
        let dir = TempDir::new().expect("temp dir");
        let path = temp_path(&dir, "absent.json");
        assert!(matches!(load(&path), Err(PersistError::Io { .. })));
    }
}
