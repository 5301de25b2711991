//! Parameter engine errors.
//!
//! # Error Categories
//!
//! - **Revision shape**: [`Error::MalformedRevision`], [`Error::YearOutOfRange`]
//! - **Validation**: [`Error::InvalidRevision`] (structural, raised before any
//!   mutation) and [`Error::RangeViolation`] (semantic, raised after commit)
//! - **Values**: [`Error::TypeMismatch`], [`Error::InsufficientRates`]
//! - **Loading**: [`Error::InvalidMetadata`], [`Error::InvalidConfig`],
//!   [`Error::Io`], [`Error::Json`]
//!
//! Structural problems fail closed: the store is untouched. Range problems are
//! detected after the revision is installed and are only raised when the
//! caller asks for it; the offending values stay in the store.

use thiserror::Error;

/// Engine result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the parameter engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Revision input is not a `name -> year -> value` structure.
    #[error("malformed revision: {0}")]
    MalformedRevision(String),

    /// A query named a parameter the metadata table does not define.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A year fell outside the permitted window.
    ///
    /// For revisions the window is `[current_year, end_year]`; for
    /// `set_year` it is `[start_year, end_year]`.
    #[error("year {year} is outside the [{min}, {max}] range")]
    YearOutOfRange {
        /// Offending year.
        year: i32,
        /// Lowest permitted year.
        min: i32,
        /// Highest permitted year.
        max: i32,
    },

    /// A value does not have the container shape or cell type its parameter
    /// declares.
    #[error("type mismatch for {name}: {message}")]
    TypeMismatch {
        /// Parameter (or expansion input) the mismatch relates to.
        name: String,
        /// Description of the mismatch.
        message: String,
    },

    /// Structural validation of a revision failed.
    ///
    /// `report` holds every accumulated `ERROR:` line so a caller can review
    /// the whole revision at once.
    #[error("revision rejected:\n{report}")]
    InvalidRevision {
        /// Accumulated error text.
        report: String,
    },

    /// Semantic validation found values outside their declared bounds.
    #[error("parameter values out of range:\n{report}")]
    RangeViolation {
        /// Accumulated error text.
        report: String,
    },

    /// Inflating a series needed more growth rates than were supplied.
    #[error("indexing needs {needed} growth rates but only {available} are available")]
    InsufficientRates {
        /// Number of rates required.
        needed: usize,
        /// Number of rates supplied.
        available: usize,
    },

    /// The defaults document describes a parameter inconsistently.
    #[error("invalid metadata for {name}: {message}")]
    InvalidMetadata {
        /// Parameter name.
        name: String,
        /// Description of the inconsistency.
        message: String,
    },

    /// Engine or family configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn type_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TypeMismatch {
            name: name.into(),
            message: message.into(),
        }
    }
}
