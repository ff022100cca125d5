use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Result, TrackIoError};
#[cfg(feature = "hdf5")]
use crate::hdf::export_hdf;
use crate::json::export_json;
use crate::matlab::export_matlab;
use crate::track::{TrackBatch, TrackRecord, Tracklet, TRACKLET_KIND};

/// On-disk formats the generic exporter can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Matlab,
    Hdf5,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Matlab => "mat",
            ExportFormat::Hdf5 => "hdf5",
        }
    }

    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension {
            "json" => Ok(ExportFormat::Json),
            "mat" => Ok(ExportFormat::Matlab),
            "hdf5" => Ok(ExportFormat::Hdf5),
            other => Err(TrackIoError::UnsupportedFormat {
                extension: format!(".{other}"),
            }),
        }
    }

    /// Infer the format of `path`. A path without extension defaults to
    /// JSON and gets `.json` appended.
    pub fn resolve(path: &Path) -> Result<(ExportFormat, PathBuf)> {
        match path.extension() {
            Some(extension) => {
                let format = ExportFormat::from_extension(&extension.to_string_lossy())?;
                Ok((format, path.to_path_buf()))
            }
            None => {
                let mut with_extension = path.as_os_str().to_owned();
                with_extension.push(".json");
                Ok((ExportFormat::Json, PathBuf::from(with_extension)))
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Check that every record is a writable tracklet and return them.
///
/// Runs before any file is created, so a bad element never leaves a
/// partial output behind.
pub fn check_tracklets(records: &[TrackRecord]) -> Result<Vec<Tracklet>> {
    if records.is_empty() {
        return Err(TrackIoError::EmptyInput);
    }
    let tracks = records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            TrackRecord::Tracklet(track) => Ok(track.clone()),
            other => Err(TrackIoError::WrongTrackType {
                index,
                expected: TRACKLET_KIND,
                found: other.kind(),
            }),
        })
        .collect::<Result<Vec<_>>>()?;
    Tracklet::validate_all(&tracks)?;
    Ok(tracks)
}

/// Generic exporter of track data.
///
/// The file type is inferred from the extension of `filename`. Returns the
/// path that was written.
pub fn export(filename: impl AsRef<Path>, records: &[TrackRecord]) -> Result<PathBuf> {
    let (format, filename) = ExportFormat::resolve(filename.as_ref())?;
    if records.is_empty() {
        return Err(TrackIoError::EmptyInput);
    }
    info!("Exporting {} tracks as {}: {}", records.len(), format, filename.display());

    match format {
        ExportFormat::Json => export_json(&filename, &check_tracklets(records)?)?,
        ExportFormat::Matlab => export_matlab(&filename, &check_tracklets(records)?)?,
        ExportFormat::Hdf5 => export_batch_hdf(&filename, TrackBatch::from_records(records)?)?,
    }
    Ok(filename)
}

#[cfg(feature = "hdf5")]
fn export_batch_hdf(filename: &Path, batch: TrackBatch) -> Result<()> {
    export_hdf(filename, &batch, &[])
}

#[cfg(not(feature = "hdf5"))]
fn export_batch_hdf(filename: &Path, _batch: TrackBatch) -> Result<()> {
    Err(TrackIoError::unsupported(format!(
        "cannot write `{}`: built without the `hdf5` feature",
        filename.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{ReferenceTrack, TrackObject};
    use tempfile::tempdir;

    fn records() -> Vec<TrackRecord> {
        (1..4)
            .map(|id| Tracklet::new(id, vec![TrackObject::new(0, 0, 1., 2., 0.)]).into())
            .collect()
    }

    #[test]
    fn test_resolve() {
        let (format, path) = ExportFormat::resolve(Path::new("out/tracks.mat")).unwrap();
        assert_eq!(format, ExportFormat::Matlab);
        assert_eq!(path, PathBuf::from("out/tracks.mat"));

        let (format, path) = ExportFormat::resolve(Path::new("out/tracks")).unwrap();
        assert_eq!(format, ExportFormat::Json);
        assert_eq!(path, PathBuf::from("out/tracks.json"));

        let err = ExportFormat::resolve(Path::new("tracks.xyz")).unwrap_err();
        assert!(matches!(err, TrackIoError::UnsupportedFormat { ref extension } if extension == ".xyz"));
        assert!(ExportFormat::resolve(Path::new("tracks.h5")).is_err());
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempdir().unwrap();
        let err = export(dir.path().join("x.xyz"), &records()).unwrap_err();
        assert!(matches!(err, TrackIoError::UnsupportedFormat { .. }));
        assert!(!dir.path().join("x.xyz").exists());
    }

    #[test]
    fn test_no_extension_defaults_to_json() {
        let dir = tempdir().unwrap();
        let written = export(dir.path().join("x"), &records()).unwrap();
        assert_eq!(written, dir.path().join("x.json"));
        assert!(written.exists());
        assert!(!dir.path().join("x").exists());
        assert_eq!(crate::json::import_json(&written).unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_non_tracklet_before_writing() {
        let dir = tempdir().unwrap();
        for name in ["tracks.json", "tracks.mat"] {
            let mut input = records();
            input.insert(1, ReferenceTrack::new(vec![0, 1]).into());
            let path = dir.path().join(name);

            let err = export(&path, &input).unwrap_err();
            match err {
                TrackIoError::WrongTrackType { index, expected, found } => {
                    assert_eq!(index, 1);
                    assert_eq!(expected, "tracklet");
                    assert_eq!(found, "reference track");
                }
                other => panic!("unexpected {other:?}"),
            }
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_duplicate_ids_rejected_before_writing() {
        let dir = tempdir().unwrap();
        for name in ["tracks.json", "tracks.mat"] {
            let mut input = records();
            input.push(Tracklet::new(2, vec![TrackObject::new(9, 4, 0., 0., 0.)]).into());
            let path = dir.path().join(name);

            let err = export(&path, &input).unwrap_err();
            assert!(matches!(err, TrackIoError::InvalidValue { ref field, .. } if field == "ID"));
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_empty_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracks.json");
        assert!(matches!(export(&path, &[]), Err(TrackIoError::EmptyInput)));
        assert!(!path.exists());
    }

    #[test]
    fn test_hdf5_rejects_tracklets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracks.hdf5");
        let err = export(&path, &records()).unwrap_err();
        assert!(err.is_type_error());
        assert!(!path.exists());
    }

    #[test]
    fn test_hdf5_rejects_mixed_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracks.hdf5");
        let mut input = records();
        input.push(ReferenceTrack::new(vec![0]).into());
        let err = export(&path, &input).unwrap_err();
        assert!(matches!(err, TrackIoError::MixedBatch { index: 3, .. }));
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn test_hdf5_references_written() {
        use crate::container::Hdf5Store;
        use crate::hdf::{Hdf5FileHandler, TrackFileHandler};

        let dir = tempdir().unwrap();
        let path = dir.path().join("tracks.hdf5");
        {
            let file = hdf5::File::create(&path).unwrap();
            let group = file.create_group("objects").unwrap().create_group("GFP").unwrap();
            let coords = ndarray::Array2::<f64>::zeros((3, 5));
            let labels = ndarray::Array2::<f64>::zeros((3, 1));
            group.new_dataset_builder().with_data(&coords).create("coords").unwrap();
            group.new_dataset_builder().with_data(&labels).create("labels").unwrap();
        }

        let input: Vec<TrackRecord> =
            vec![ReferenceTrack::new(vec![0, 2]).into(), ReferenceTrack::new(vec![1]).into()];
        assert_eq!(export(&path, &input).unwrap(), path);

        let handler = Hdf5FileHandler::<Hdf5Store>::open(&path).unwrap();
        assert_eq!(
            handler.read_tracks().unwrap(),
            vec![ReferenceTrack::new(vec![0, 2]), ReferenceTrack::new(vec![1])]
        );
    }
}
