//! Hierarchical dataset containers read and written by the HDF5 codec.
//!
//! Paths are `/`-separated and relative to the root group, e.g.
//! `objects/GFP/coords`. All datasets handled here are two dimensional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray as nd;

use crate::error::{Result, TrackIoError};
use crate::my_types::*;

pub trait DatasetStore {
    /// Where the data lives, for logs and error messages.
    fn location(&self) -> &Path;

    /// Names of the direct members of `group`, sorted by name.
    fn member_names(&self, group: &str) -> Result<Vec<String>>;

    /// True if a group or dataset exists at `path`.
    fn contains(&self, path: &str) -> bool;

    fn read_f64(&self, path: &str) -> Result<Matrixd>;

    fn read_i64(&self, path: &str) -> Result<nd::Array2<i64>>;

    /// Create or replace the dataset at `path`.
    fn write_f64(&mut self, path: &str, data: &Matrixd) -> Result<()>;

    /// Create or replace the dataset at `path`.
    fn write_i64(&mut self, path: &str, data: &nd::Array2<i64>) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq)]
enum MemoryDataset {
    F64(Matrixd),
    I64(nd::Array2<i64>),
}

/// In-memory container with the same group layout as an HDF5 file.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    location: PathBuf,
    datasets: BTreeMap<String, MemoryDataset>,
}

impl MemoryStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        MemoryStore {
            location: location.into(),
            datasets: BTreeMap::new(),
        }
    }

    pub fn with_f64(mut self, path: &str, data: Matrixd) -> Self {
        self.datasets.insert(path.to_string(), MemoryDataset::F64(data));
        self
    }

    pub fn with_i64(mut self, path: &str, data: nd::Array2<i64>) -> Self {
        self.datasets.insert(path.to_string(), MemoryDataset::I64(data));
        self
    }

    fn dataset(&self, path: &str) -> Result<&MemoryDataset> {
        self.datasets
            .get(path)
            .ok_or_else(|| TrackIoError::not_found(self.location.join(path), "dataset"))
    }
}

impl DatasetStore for MemoryStore {
    fn location(&self) -> &Path {
        &self.location
    }

    fn member_names(&self, group: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", group.trim_end_matches('/'));
        let mut names: Vec<String> = self
            .datasets
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(TrackIoError::not_found(self.location.join(group), "group"));
        }
        Ok(names)
    }

    fn contains(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.datasets
            .keys()
            .any(|key| key == path || key.starts_with(&prefix))
    }

    fn read_f64(&self, path: &str) -> Result<Matrixd> {
        match self.dataset(path)? {
            MemoryDataset::F64(data) => Ok(data.clone()),
            MemoryDataset::I64(data) => Ok(data.mapv(|v| v as f64)),
        }
    }

    fn read_i64(&self, path: &str) -> Result<nd::Array2<i64>> {
        match self.dataset(path)? {
            MemoryDataset::I64(data) => Ok(data.clone()),
            MemoryDataset::F64(_) => Err(TrackIoError::invalid_value(
                path,
                "expected an integer dataset, found floating point",
            )),
        }
    }

    fn write_f64(&mut self, path: &str, data: &Matrixd) -> Result<()> {
        self.datasets.insert(path.to_string(), MemoryDataset::F64(data.clone()));
        Ok(())
    }

    fn write_i64(&mut self, path: &str, data: &nd::Array2<i64>) -> Result<()> {
        self.datasets.insert(path.to_string(), MemoryDataset::I64(data.clone()));
        Ok(())
    }
}

#[cfg(feature = "hdf5")]
pub use self::hdf5_file::Hdf5Store;

#[cfg(feature = "hdf5")]
mod hdf5_file {
    use super::*;
    use hdf5::H5Type;

    /// An open HDF5 file. The handle is released when the store is dropped.
    pub struct Hdf5Store {
        file: hdf5::File,
        path: PathBuf,
    }

    impl Hdf5Store {
        /// Open an existing file, read-write when `writable`.
        pub fn open(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
            let path = path.as_ref();
            if !path.exists() {
                return Err(TrackIoError::not_found(path, "HDF5 file"));
            }
            let file = if writable {
                hdf5::File::open_rw(path)
            } else {
                hdf5::File::open(path)
            }
            .map_err(|e| TrackIoError::hdf5(path, e))?;
            Ok(Hdf5Store {
                file,
                path: path.to_path_buf(),
            })
        }

        fn write<T: H5Type>(&mut self, path: &str, data: &nd::Array2<T>) -> Result<()> {
            if self.file.link_exists(path) {
                self.file
                    .unlink(path)
                    .map_err(|e| TrackIoError::hdf5(&self.path, e))?;
            }
            self.file
                .new_dataset_builder()
                .with_data(data)
                .create(path)
                .map_err(|e| TrackIoError::hdf5(&self.path, e))?;
            Ok(())
        }
    }

    impl DatasetStore for Hdf5Store {
        fn location(&self) -> &Path {
            &self.path
        }

        fn member_names(&self, group: &str) -> Result<Vec<String>> {
            if !self.file.link_exists(group) {
                return Err(TrackIoError::not_found(self.path.join(group), "group"));
            }
            let mut names = self
                .file
                .group(group)
                .and_then(|g| g.member_names())
                .map_err(|e| TrackIoError::hdf5(&self.path, e))?;
            // same order as MemoryStore
            names.sort();
            Ok(names)
        }

        fn contains(&self, path: &str) -> bool {
            self.file.link_exists(path)
        }

        fn read_f64(&self, path: &str) -> Result<Matrixd> {
            if !self.file.link_exists(path) {
                return Err(TrackIoError::not_found(self.path.join(path), "dataset"));
            }
            self.file
                .dataset(path)
                .and_then(|d| d.read_2d::<f64>())
                .map_err(|e| TrackIoError::hdf5(&self.path, e))
        }

        fn read_i64(&self, path: &str) -> Result<nd::Array2<i64>> {
            if !self.file.link_exists(path) {
                return Err(TrackIoError::not_found(self.path.join(path), "dataset"));
            }
            self.file
                .dataset(path)
                .and_then(|d| d.read_2d::<i64>())
                .map_err(|e| TrackIoError::hdf5(&self.path, e))
        }

        fn write_f64(&mut self, path: &str, data: &Matrixd) -> Result<()> {
            self.write(path, data)
        }

        fn write_i64(&mut self, path: &str, data: &nd::Array2<i64>) -> Result<()> {
            self.write(path, data)
        }
    }
}
