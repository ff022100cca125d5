use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, TrackIoError};
use crate::track::{CellType, Tracklet};

const TRACKLET_KEYS: [&str; 5] = ["ID", "parentID", "rootID", "fate_label", "objects"];
const OBJECT_KEYS: [&str; 7] = ["id", "t", "x", "y", "z", "dummy", "type"];
const MANIFEST_KEYS: [&str; 3] = ["path", "zipped", "files"];

/// Entry of a `tracks_<cell_type>.json` manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub zipped: bool,
    pub files: Vec<String>,
}

pub fn track_filename(track: &Tracklet, cell_type: Option<CellType>) -> String {
    format!("track_{}_{}.json", track.id, CellType::tag(cell_type))
}

pub fn manifest_filename(cell_type: Option<CellType>) -> String {
    format!("tracks_{}.json", CellType::tag(cell_type))
}

pub fn archive_filename(cell_type: Option<CellType>) -> String {
    format!("tracks_{}.zip", CellType::tag(cell_type))
}

/// Write a value as a 2-space indented document.
fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| TrackIoError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| TrackIoError::json(path, e))?;
    writer.flush().map_err(|e| TrackIoError::io(path, e))
}

fn require_keys(doc: &Map<String, Value>, keys: &[&str], context: &str) -> Result<()> {
    match keys.iter().find(|key| !doc.contains_key(**key)) {
        Some(key) => Err(TrackIoError::missing_key(*key, context)),
        None => Ok(()),
    }
}

/// Check a decoded track document, objects included, before materializing it.
fn check_track_document(value: &Value, context: &str) -> Result<()> {
    let doc = value
        .as_object()
        .ok_or_else(|| TrackIoError::invalid_value(context, "track document is not a map"))?;
    require_keys(doc, &TRACKLET_KEYS, context)?;
    let objects = doc["objects"]
        .as_array()
        .ok_or_else(|| TrackIoError::invalid_value("objects", format!("not a list in {context}")))?;
    for (i, object) in objects.iter().enumerate() {
        let object_context = format!("objects[{i}] of {context}");
        let object = object.as_object().ok_or_else(|| {
            TrackIoError::invalid_value(object_context.as_str(), "object is not a map")
        })?;
        require_keys(object, &OBJECT_KEYS, &object_context)?;
    }
    Ok(())
}

fn tracklet_from_value(value: Value, source: &Path, context: &str) -> Result<Tracklet> {
    check_track_document(&value, context)?;
    serde_json::from_value(value).map_err(|e| TrackIoError::json(source, e))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| TrackIoError::io(path, e))
}

/// Export a single track as a JSON file.
pub fn export_single_track_json(filename: impl AsRef<Path>, track: &Tracklet) -> Result<()> {
    let filename = filename.as_ref();
    track.validate()?;
    write_pretty(filename, track)
}

/// Export a collection keyed by `Tracklet_<ID>`, in ascending ID order.
pub fn export_json(filename: impl AsRef<Path>, tracks: &[Tracklet]) -> Result<()> {
    let filename = filename.as_ref();
    Tracklet::validate_all(tracks)?;

    let mut sorted: Vec<&Tracklet> = tracks.iter().collect();
    sorted.sort_by_key(|t| t.id);

    let mut export = Map::with_capacity(sorted.len());
    for track in sorted {
        let doc = serde_json::to_value(track).map_err(|e| TrackIoError::json(filename, e))?;
        export.insert(format!("Tracklet_{}", track.id), doc);
    }

    info!("Writing {} tracks to: {}", tracks.len(), filename.display());
    write_pretty(filename, &export)
}

/// Read a collection written by [`export_json`], in file order.
pub fn import_json(filename: impl AsRef<Path>) -> Result<Vec<Tracklet>> {
    let filename = filename.as_ref();
    if !filename.exists() {
        return Err(TrackIoError::not_found(filename, "tracking data file"));
    }
    let bytes = read_file(filename)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| TrackIoError::json(filename, e))?;
    let Value::Object(collection) = value else {
        return Err(TrackIoError::invalid_value(
            filename.display().to_string(),
            "track collection is not a map",
        ));
    };

    collection
        .into_iter()
        .map(|(key, doc)| tracklet_from_value(doc, filename, &key))
        .collect()
}

/// Export every track to its own file, optionally bundled into a zip
/// archive, and write the manifest describing them.
pub fn export_all_tracks_json(
    export_dir: impl AsRef<Path>,
    tracks: &[Tracklet],
    cell_type: Option<CellType>,
    as_zip_archive: bool,
) -> Result<ManifestEntry> {
    let export_dir = export_dir.as_ref();
    if !export_dir.is_dir() {
        return Err(TrackIoError::not_found(export_dir, "export directory"));
    }
    Tracklet::validate_all(tracks)?;

    info!("Writing out JSON files to dir: {}", export_dir.display());
    let mut filenames = Vec::with_capacity(tracks.len());
    for track in tracks {
        let name = track_filename(track, cell_type);
        export_single_track_json(export_dir.join(&name), track)?;
        filenames.push(name);
        Span::current().pb_inc(1);
    }

    if as_zip_archive {
        let zip_path = export_dir.join(archive_filename(cell_type));
        write_zip_archive(&zip_path, export_dir, &filenames)?;

        // the archive is synced, the loose copies can go
        for name in &filenames {
            let loose = export_dir.join(name);
            fs::remove_file(&loose).map_err(|e| TrackIoError::io(&loose, e))?;
        }
    }

    let entry = ManifestEntry {
        path: export_dir.display().to_string(),
        zipped: as_zip_archive,
        files: filenames,
    };
    let mut manifest = Map::new();
    manifest.insert(
        CellType::tag(cell_type).to_string(),
        serde_json::to_value(&entry).map_err(|e| TrackIoError::json(export_dir, e))?,
    );

    let manifest_path = export_dir.join(manifest_filename(cell_type));
    info!("Writing out JSON file list to: {}", manifest_path.display());
    write_pretty(&manifest_path, &manifest)?;

    Ok(entry)
}

fn write_zip_archive(zip_path: &Path, dir: &Path, filenames: &[String]) -> Result<()> {
    let file = File::create(zip_path).map_err(|e| TrackIoError::io(zip_path, e))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in filenames {
        let bytes = read_file(&dir.join(name))?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| TrackIoError::zip(zip_path, e))?;
        writer.write_all(&bytes).map_err(|e| TrackIoError::io(zip_path, e))?;
    }

    let file = writer.finish().map_err(|e| TrackIoError::zip(zip_path, e))?;
    file.sync_all().map_err(|e| TrackIoError::io(zip_path, e))?;
    debug!("Archived {} files into {}", filenames.len(), zip_path.display());
    Ok(())
}

/// Load the manifest entry for `cell_type` from `folder`.
pub fn read_manifest(folder: impl AsRef<Path>, cell_type: Option<CellType>) -> Result<ManifestEntry> {
    let manifest_path = folder.as_ref().join(manifest_filename(cell_type));
    if !manifest_path.exists() {
        return Err(TrackIoError::not_found(&manifest_path, "tracking data file"));
    }

    let bytes = read_file(&manifest_path)?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| TrackIoError::json(&manifest_path, e))?;
    let context = manifest_path.display().to_string();
    let tag = CellType::tag(cell_type);
    let entry = value
        .get(tag)
        .ok_or_else(|| TrackIoError::missing_key(tag, context.as_str()))?;
    let fields = entry
        .as_object()
        .ok_or_else(|| TrackIoError::invalid_value(tag, "manifest entry is not a map"))?;
    require_keys(fields, &MANIFEST_KEYS, &context)?;

    serde_json::from_value(entry.clone()).map_err(|e| TrackIoError::json(&manifest_path, e))
}

/// Import all tracks listed in the `cell_type` manifest of `folder`.
///
/// Each track receives the cell type and its file name as provenance.
pub fn import_all_tracks_json(
    folder: impl AsRef<Path>,
    cell_type: Option<CellType>,
) -> Result<Vec<Tracklet>> {
    let folder = folder.as_ref();
    let manifest = read_manifest(folder, cell_type)?;

    let provenance = |bytes: &[u8], source: PathBuf, name: &str| -> Result<Tracklet> {
        let mut value: Value =
            serde_json::from_slice(bytes).map_err(|e| TrackIoError::json(&source, e))?;
        if let Some(doc) = value.as_object_mut() {
            let tag = serde_json::to_value(cell_type).map_err(|e| TrackIoError::json(&source, e))?;
            doc.insert("cell_type".to_string(), tag);
            doc.insert("filename".to_string(), Value::String(name.to_string()));
        }
        tracklet_from_value(value, &source, name)
    };

    let mut tracks = Vec::with_capacity(manifest.files.len());
    if manifest.zipped {
        let zip_path = folder.join(archive_filename(cell_type));
        let file = File::open(&zip_path).map_err(|e| TrackIoError::io(&zip_path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| TrackIoError::zip(&zip_path, e))?;
        for name in &manifest.files {
            let mut entry = archive
                .by_name(name)
                .map_err(|e| TrackIoError::zip(&zip_path, e))?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| TrackIoError::io(&zip_path, e))?;
            tracks.push(provenance(&bytes, zip_path.join(name), name)?);
        }
    } else {
        for name in &manifest.files {
            let path = folder.join(name);
            let bytes = read_file(&path)?;
            tracks.push(provenance(&bytes, path, name)?);
        }
    }

    info!("Loaded {} tracks from {}", tracks.len(), folder.display());
    Ok(tracks)
}
