//! Error types for score loading and excerpt selection.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a file or byte buffer into a [`Score`](crate::Score).
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Failed to read file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid UTF-8 in MusicXML file: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Only `score-partwise` documents are read.
    #[error("Unsupported root element: '{0}'. Only 'score-partwise' is supported.")]
    UnsupportedRoot(String),

    #[error("Failed to open MXL archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to read '{name}' from MXL archive: {source}")]
    ArchiveEntry {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No MusicXML file found in archive. Files: {0:?}")]
    MissingRootFile(Vec<String>),
}

/// Why a section could not be produced from the score.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error(transparent)]
    Load(#[from] ScoreError),

    #[error("Not enough parts in score")]
    InsufficientParts,

    #[error("Not enough measures in part: need {required}, found {found}")]
    InsufficientMeasures { required: usize, found: usize },
}
