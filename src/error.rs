//! Error types for the sonatadata library

use std::io;

/// Library error type for sonatadata operations
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Malformed TSV, fraction, catalog or MusicXML content
    #[error("parsing error: {0}")]
    ParsingError(String),

    /// Invalid or incomplete run configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Join requested with too few kinds of data
    #[error("join error: {0}")]
    JoinError(String),

    /// MXL archive could not be read
    #[error("archive error: {0}")]
    ArchiveError(String),

    /// A measure offers more than two alternative continuations
    #[error("not implemented: mc {mc} has {successors} successors (more than two voltas)")]
    UnsupportedVolta { mc: u32, successors: usize },

    /// A measure without successors before the end of the movement
    #[error("not implemented: mc {mc} has no successor but is not the last measure")]
    UnexpectedTerminal { mc: u32 },

    /// The last measure offers two alternative continuations
    #[error("not implemented: last mc {mc} branches into two endings")]
    UnsupportedFinalBranch { mc: u32 },

    /// A successor that does not exist in the measure table
    #[error("measure table has no mc {mc}")]
    UnknownMeasure { mc: u32 },

    /// The measure walk did not reach the end of the movement
    #[error("unfolding did not terminate within {limit} measures")]
    NonTerminating { limit: usize },
}

impl From<io::Error> for DataError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

impl From<zip::result::ZipError> for DataError {
    fn from(error: zip::result::ZipError) -> Self {
        Self::ArchiveError(error.to_string())
    }
}
