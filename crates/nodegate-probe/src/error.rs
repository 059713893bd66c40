//! Probe error types.

use std::path::PathBuf;

use thiserror::Error;

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Why a capacity figure could not be obtained.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The report could not be opened or read.
    #[error("could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field was present but its value did not parse.
    #[error("malformed {field} value {value:?}")]
    Malformed { field: String, value: String },

    /// None of the expected fields were present.
    #[error("report has no {0} field")]
    MissingField(String),
}

impl ProbeError {
    /// True when the source itself could not be read, as opposed to
    /// being read but containing garbage.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Unreadable { .. })
    }
}
