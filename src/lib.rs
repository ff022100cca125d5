//! Persistence of tracking results: tracklets with lineage, fate and
//! per-object detections, exchanged as per-track JSON, MATLAB matrices and
//! HDF5 files.

pub mod config;
pub mod container;
pub mod error;
pub mod fate;
pub mod format;
pub mod hdf;
pub mod json;
pub mod matlab;
pub mod my_types;
pub mod track;

pub use error::{Result, TrackIoError};
pub use format::{export, ExportFormat};
pub use track::{CellType, FateLabel, ReferenceTrack, TrackBatch, TrackObject, TrackRecord, Tracklet};
