//! Error types for the track exchange layer.
//!
//! Every codec returns [`TrackIoError`]. The variants fall into four groups:
//!
//! ```text
//! type errors      WrongTrackType, MixedBatch, Unsupported
//! format errors    UnsupportedFormat
//! not-found        NotFound
//! schema errors    RowCountMismatch, MissingKey, EmptyTrack, EmptyInput, InvalidValue
//! ```
//!
//! plus wrappers around the underlying I/O, JSON, zip and HDF5 failures.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient `Result` alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackIoError>;

#[derive(Debug, Error)]
pub enum TrackIoError {
    /// An input element is not the kind of track the operation needs.
    #[error("element {index} has the wrong track type: expected {expected}, found {found}")]
    WrongTrackType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A batch mixes tracklets and reference tracks.
    #[error("track batch mixes tracklets and reference tracks (element {index} is a {found})")]
    MixedBatch { index: usize, found: &'static str },

    /// The operation exists in the interface but not for this input or schema.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The filename carries an extension no codec handles.
    #[error("export format not recognised: `{extension}`")]
    UnsupportedFormat { extension: String },

    /// An expected file, dataset or manifest is absent.
    #[error("{what} not found: `{path}`")]
    NotFound { path: PathBuf, what: &'static str },

    /// Two paired datasets disagree on their number of rows.
    #[error("row count mismatch in `{location}`: coords has {coords} rows, labels has {labels}")]
    RowCountMismatch {
        location: String,
        coords: usize,
        labels: usize,
    },

    /// A decoded document lacks a required key.
    #[error("missing key `{key}` in {context}")]
    MissingKey { key: String, context: String },

    /// A tracklet without objects cannot be written.
    #[error("tracklet {id} has no objects")]
    EmptyTrack { id: i64 },

    #[error("no tracks to export")]
    EmptyInput,

    /// A value has the right key but an unusable shape or content.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The file handler was already closed.
    #[error("file handler for `{path}` is closed")]
    Closed { path: PathBuf },

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode JSON in `{path}`: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("zip archive `{path}`: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error in `{path}`: {source}")]
    Hdf5 {
        path: PathBuf,
        #[source]
        source: hdf5::Error,
    },
}

impl TrackIoError {
    /// Construct a [`TrackIoError::NotFound`].
    pub fn not_found(path: impl Into<PathBuf>, what: &'static str) -> Self {
        TrackIoError::NotFound { path: path.into(), what }
    }

    /// Construct a [`TrackIoError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackIoError::Io { path: path.into(), source }
    }

    /// Construct a [`TrackIoError::Json`].
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        TrackIoError::Json { path: path.into(), source }
    }

    /// Construct a [`TrackIoError::Zip`].
    pub fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        TrackIoError::Zip { path: path.into(), source }
    }

    /// Construct a [`TrackIoError::MissingKey`].
    pub fn missing_key<K: Into<String>, C: Into<String>>(key: K, context: C) -> Self {
        TrackIoError::MissingKey { key: key.into(), context: context.into() }
    }

    /// Construct a [`TrackIoError::InvalidValue`].
    pub fn invalid_value<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        TrackIoError::InvalidValue { field: field.into(), reason: reason.into() }
    }

    /// Construct a [`TrackIoError::Unsupported`].
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        TrackIoError::Unsupported(msg.into())
    }

    #[cfg(feature = "hdf5")]
    pub fn hdf5(path: impl Into<PathBuf>, source: hdf5::Error) -> Self {
        TrackIoError::Hdf5 { path: path.into(), source }
    }

    /// True for the type-error group of the taxonomy.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            TrackIoError::WrongTrackType { .. }
                | TrackIoError::MixedBatch { .. }
                | TrackIoError::Unsupported(_)
        )
    }
}
