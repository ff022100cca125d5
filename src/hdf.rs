//! Track file handlers for the two HDF5 schema generations.
//!
//! Current schema:
//!
//! ```text
//! objects/
//!     <class>/
//!         coords      [t, x, y, z, type]
//!         labels      [label, ...]
//! dummies             [t, x, y, z, type]
//! tracks              object ids per row, padded with -1
//! ```
//!
//! Legacy schema (deprecated, read only):
//!
//! ```text
//! frames/
//!     frame_1/
//!         coords      [t, x, y, z, type]
//!         labels      optional
//!     frame_2/
//!     ...
//! ```
//!
//! Object ids are assigned while reading, starting at 0 and continuing
//! across classes or frames, so they are unique within one opened file.

#[cfg(feature = "hdf5")]
use std::path::Path;
use std::path::PathBuf;

use log::{debug, info, warn};
use ndarray as nd;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::container::DatasetStore;
#[cfg(feature = "hdf5")]
use crate::container::Hdf5Store;
use crate::error::{Result, TrackIoError};
use crate::my_types::*;
use crate::track::{ReferenceTrack, TrackBatch, TrackObject};

const OBJECTS_GROUP: &str = "objects";
const FRAMES_GROUP: &str = "frames";
const DUMMIES_DATASET: &str = "dummies";
const TRACKS_DATASET: &str = "tracks";

/// Padding value in the `tracks` dataset.
const NO_OBJECT: ObjectId = -1;

/// Coords column holding the object type in the legacy schema.
const LEGACY_TYPE_COLUMN: usize = 4;

/// Operations shared by both schema generations.
pub trait TrackFileHandler {
    fn read_objects(&self) -> Result<Vec<TrackObject>>;

    fn read_dummies(&self) -> Result<Vec<TrackObject>>;

    fn read_tracks(&self) -> Result<Vec<ReferenceTrack>>;

    fn write_tracks(&mut self, batch: &TrackBatch) -> Result<()>;

    /// Release the file. Calling it again does nothing.
    fn close(&mut self);
}

/// Source of object ids during one read of a file.
#[derive(Debug, Default)]
pub struct ObjectIdCounter {
    next: ObjectId,
}

impl ObjectIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ObjectId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn count(&self) -> ObjectId {
        self.next
    }
}

/// Where an object's `type` comes from.
#[derive(Clone, Copy, Debug)]
enum ObjectType {
    /// 1-based position of the class group
    Group(i64),
    /// the coords column of the given index
    Column(usize),
}

/// Build one object per coords row.
fn objects_from_rows(
    coords: &Matrixd,
    labels: Option<&Matrixd>,
    object_type: ObjectType,
    counter: &mut ObjectIdCounter,
    location: &str,
) -> Result<Vec<TrackObject>> {
    let min_columns = match object_type {
        ObjectType::Group(_) => 4,
        ObjectType::Column(column) => column + 1,
    };
    if coords.ncols() < min_columns {
        return Err(TrackIoError::invalid_value(
            format!("{location}/coords"),
            format!("expected at least {min_columns} columns, found {}", coords.ncols()),
        ));
    }
    if let Some(labels) = labels {
        if labels.nrows() != coords.nrows() {
            return Err(TrackIoError::RowCountMismatch {
                location: location.to_string(),
                coords: coords.nrows(),
                labels: labels.nrows(),
            });
        }
    }

    let objects = coords
        .outer_iter()
        .enumerate()
        .map(|(i, row)| {
            let label = labels
                .filter(|l| l.ncols() > 0)
                .map(|l| l[[i, 0]] as i64)
                .unwrap_or(0);
            let object_type = match object_type {
                ObjectType::Group(index) => index,
                ObjectType::Column(column) => row[column] as i64,
            };
            TrackObject {
                id: counter.next_id(),
                t: row[0] as i64,
                x: row[1],
                y: row[2],
                z: row[3],
                dummy: false,
                label,
                object_type,
                probability: vec![0.],
            }
        })
        .collect();
    Ok(objects)
}

/// Dummy objects get ids -1, -2, ... so they never collide with real ones.
fn read_dummy_objects<S: DatasetStore>(store: &S) -> Result<Vec<TrackObject>> {
    if !store.contains(DUMMIES_DATASET) {
        return Ok(vec![]);
    }
    let rows = store.read_f64(DUMMIES_DATASET)?;
    let mut counter = ObjectIdCounter::new();
    let mut dummies = objects_from_rows(
        &rows,
        None,
        ObjectType::Column(LEGACY_TYPE_COLUMN),
        &mut counter,
        DUMMIES_DATASET,
    )?;
    for dummy in dummies.iter_mut() {
        dummy.id = -(dummy.id + 1);
        dummy.dummy = true;
    }
    Ok(dummies)
}

fn read_reference_tracks<S: DatasetStore>(store: &S) -> Result<Vec<ReferenceTrack>> {
    if !store.contains(TRACKS_DATASET) {
        return Ok(vec![]);
    }
    let refs = store.read_i64(TRACKS_DATASET)?;
    Ok(refs
        .outer_iter()
        .map(|row| {
            ReferenceTrack::new(row.iter().copied().take_while(|r| *r != NO_OBJECT).collect())
        })
        .collect())
}

/// Pack reference tracks into rows padded with [`NO_OBJECT`].
fn pack_reference_tracks(tracks: &[ReferenceTrack]) -> nd::Array2<i64> {
    let width = tracks.iter().map(ReferenceTrack::len).max().unwrap_or(0).max(1);
    let mut packed = nd::Array2::from_elem((tracks.len(), width), NO_OBJECT);
    for (mut row, track) in packed.outer_iter_mut().zip(tracks) {
        for (slot, id) in row.iter_mut().zip(track.refs()) {
            *slot = *id;
        }
    }
    packed
}

/// Look up the objects a reference track points at.
pub fn resolve_reference(objects: &[TrackObject], track: &ReferenceTrack) -> Result<Vec<TrackObject>> {
    track
        .refs()
        .iter()
        .map(|id| {
            objects
                .iter()
                .find(|o| o.id == *id)
                .cloned()
                .ok_or_else(|| TrackIoError::invalid_value("refs", format!("no object with id {id}")))
        })
        .collect()
}

/// Owns the store of a handler until it is closed or dropped.
struct StoreSlot<S: DatasetStore> {
    store: Option<S>,
    location: PathBuf,
}

impl<S: DatasetStore> StoreSlot<S> {
    fn new(store: S) -> Self {
        let location = store.location().to_path_buf();
        info!("Opening HDF file: {}", location.display());
        StoreSlot {
            store: Some(store),
            location,
        }
    }

    fn get(&self) -> Result<&S> {
        self.store.as_ref().ok_or_else(|| TrackIoError::Closed {
            path: self.location.clone(),
        })
    }

    fn get_mut(&mut self) -> Result<&mut S> {
        let location = &self.location;
        self.store.as_mut().ok_or_else(|| TrackIoError::Closed {
            path: location.clone(),
        })
    }

    fn close(&mut self) {
        if let Some(store) = self.store.take() {
            drop(store);
            info!("Closing HDF file: {}", self.location.display());
        }
    }
}

impl<S: DatasetStore> Drop for StoreSlot<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handler for the current, per-class schema.
pub struct Hdf5FileHandler<S: DatasetStore> {
    slot: StoreSlot<S>,
}

impl<S: DatasetStore> Hdf5FileHandler<S> {
    pub fn new(store: S) -> Self {
        Self {
            slot: StoreSlot::new(store),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.store.is_none()
    }

    fn object_count(&self) -> Result<usize> {
        let store = self.slot.get()?;
        let mut count = 0;
        for class in store.member_names(OBJECTS_GROUP)? {
            count += store.read_f64(&format!("{OBJECTS_GROUP}/{class}/coords"))?.nrows();
        }
        Ok(count)
    }

    /// Store dummy objects as `[t, x, y, z, type]` rows.
    pub fn write_dummies(&mut self, dummies: &[TrackObject]) -> Result<()> {
        let rows = nd::Array2::from_shape_fn((dummies.len(), 5), |(i, c)| {
            let d = &dummies[i];
            match c {
                0 => d.t as f64,
                1 => d.x,
                2 => d.y,
                3 => d.z,
                _ => d.object_type as f64,
            }
        });
        info!("Writing {} dummies", dummies.len());
        self.slot.get_mut()?.write_f64(DUMMIES_DATASET, &rows)
    }
}

#[cfg(feature = "hdf5")]
impl Hdf5FileHandler<Hdf5Store> {
    /// Open an existing HDF5 file for reading and writing tracks.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Hdf5Store::open(path, true)?))
    }
}

impl<S: DatasetStore> TrackFileHandler for Hdf5FileHandler<S> {
    fn read_objects(&self) -> Result<Vec<TrackObject>> {
        let store = self.slot.get()?;
        let mut counter = ObjectIdCounter::new();
        let mut objects = vec![];

        for (ci, class) in store.member_names(OBJECTS_GROUP)?.iter().enumerate() {
            let group = format!("{OBJECTS_GROUP}/{class}");
            let labels_path = format!("{group}/labels");
            if !store.contains(&labels_path) {
                return Err(TrackIoError::not_found(store.location().join(&labels_path), "dataset"));
            }
            // whole datasets go into memory in one read
            let coords = store.read_f64(&format!("{group}/coords"))?;
            let labels = store.read_f64(&labels_path)?;
            info!("Loading {} {:?}...", class, coords.dim());

            let class_objects = objects_from_rows(
                &coords,
                Some(&labels),
                ObjectType::Group(ci as i64 + 1),
                &mut counter,
                &group,
            )?;
            objects.extend(class_objects);
            Span::current().pb_inc(1);
        }
        debug!("Read {} objects from {}", counter.count(), store.location().display());
        Ok(objects)
    }

    fn read_dummies(&self) -> Result<Vec<TrackObject>> {
        read_dummy_objects(self.slot.get()?)
    }

    fn read_tracks(&self) -> Result<Vec<ReferenceTrack>> {
        read_reference_tracks(self.slot.get()?)
    }

    fn write_tracks(&mut self, batch: &TrackBatch) -> Result<()> {
        let tracks = match batch {
            TrackBatch::References(tracks) => tracks,
            TrackBatch::Tracklets(_) => {
                return Err(TrackIoError::unsupported(
                    "only reference tracks can be written to an HDF5 file, not tracklets",
                ))
            }
        };
        if tracks.is_empty() {
            return Err(TrackIoError::EmptyInput);
        }

        let n_objects = self.object_count()? as ObjectId;
        if let Some(bad) = tracks
            .iter()
            .flat_map(|t| t.refs())
            .find(|id| **id < 0 || **id >= n_objects)
        {
            return Err(TrackIoError::invalid_value(
                "refs",
                format!("object id {bad} outside 0..{n_objects}"),
            ));
        }

        let packed = pack_reference_tracks(tracks);
        info!("Writing {} tracks to {}", tracks.len(), self.slot.location.display());
        self.slot.get_mut()?.write_i64(TRACKS_DATASET, &packed)
    }

    fn close(&mut self) {
        self.slot.close();
    }
}

/// Numeral embedded in a frame group name, `frame_12` -> 12.
fn frame_number(name: &str) -> Option<u64> {
    name.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse::<u64>()
        .ok()
}

/// Handler for the deprecated per-frame schema.
pub struct LegacyHdf5FileHandler<S: DatasetStore> {
    slot: StoreSlot<S>,
}

impl<S: DatasetStore> LegacyHdf5FileHandler<S> {
    pub fn new(store: S) -> Self {
        warn!("LegacyHdf5FileHandler has been deprecated.");
        Self {
            slot: StoreSlot::new(store),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.store.is_none()
    }

    /// Frame group names in numeral order.
    fn sorted_frames(store: &S) -> Result<Vec<String>> {
        let mut frames = store
            .member_names(FRAMES_GROUP)?
            .into_iter()
            .map(|name| match frame_number(&name) {
                Some(n) => Ok((n, name)),
                None => Err(TrackIoError::invalid_value(
                    format!("{FRAMES_GROUP}/{name}"),
                    "frame group name carries no frame number",
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        frames.sort_by_key(|(n, _)| *n);
        Ok(frames.into_iter().map(|(_, name)| name).collect())
    }
}

#[cfg(feature = "hdf5")]
impl LegacyHdf5FileHandler<Hdf5Store> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Hdf5Store::open(path, false)?))
    }
}

impl<S: DatasetStore> TrackFileHandler for LegacyHdf5FileHandler<S> {
    fn read_objects(&self) -> Result<Vec<TrackObject>> {
        let store = self.slot.get()?;
        let mut counter = ObjectIdCounter::new();
        let mut objects = vec![];

        for frame in Self::sorted_frames(store)? {
            let group = format!("{FRAMES_GROUP}/{frame}");
            let coords = store.read_f64(&format!("{group}/coords"))?;
            let labels_path = format!("{group}/labels");
            let labels = if store.contains(&labels_path) {
                Some(store.read_f64(&labels_path)?)
            } else {
                None
            };
            debug!("Loading {} {:?}", group, coords.dim());

            objects.extend(objects_from_rows(
                &coords,
                labels.as_ref(),
                ObjectType::Column(LEGACY_TYPE_COLUMN),
                &mut counter,
                &group,
            )?);
            Span::current().pb_inc(1);
        }
        Ok(objects)
    }

    fn read_dummies(&self) -> Result<Vec<TrackObject>> {
        read_dummy_objects(self.slot.get()?)
    }

    fn read_tracks(&self) -> Result<Vec<ReferenceTrack>> {
        read_reference_tracks(self.slot.get()?)
    }

    fn write_tracks(&mut self, _batch: &TrackBatch) -> Result<()> {
        Err(TrackIoError::unsupported(
            "the legacy per-frame schema is read only, use Hdf5FileHandler",
        ))
    }

    fn close(&mut self) {
        self.slot.close();
    }
}

/// Write reference tracks, and optionally dummies, into an existing file.
#[cfg(feature = "hdf5")]
pub fn export_hdf(
    filename: impl AsRef<Path>,
    batch: &TrackBatch,
    dummies: &[TrackObject],
) -> Result<()> {
    let filename = filename.as_ref();
    if let TrackBatch::Tracklets(_) = batch {
        return Err(TrackIoError::unsupported(
            "only reference tracks can be written to an HDF5 file, not tracklets",
        ));
    }
    if !filename.exists() {
        return Err(TrackIoError::not_found(filename, "HDF5 file"));
    }

    let mut handler = Hdf5FileHandler::<Hdf5Store>::open(filename)?;
    handler.write_tracks(batch)?;
    if !dummies.is_empty() {
        handler.write_dummies(dummies)?;
    }
    handler.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryStore;
    use crate::track::Tracklet;

    /// `n` rows `[t, x, y, z, type]` with t = first_t + i + 0.7.
    fn coords(n: usize, first_t: f64, type_column: f64) -> Matrixd {
        nd::Array2::from_shape_fn((n, 5), |(i, c)| match c {
            0 => first_t + i as f64 + 0.7,
            1 => 10. * i as f64,
            2 => 20. * i as f64,
            3 => 0.,
            _ => type_column,
        })
    }

    fn labels(n: usize, label: f64) -> Matrixd {
        nd::Array2::from_elem((n, 2), label)
    }

    fn current_store() -> MemoryStore {
        MemoryStore::new("current.h5")
            .with_f64("objects/A/coords", coords(3, 0., 9.))
            .with_f64("objects/A/labels", labels(3, 1.))
            .with_f64("objects/B/coords", coords(2, 5., 9.))
            .with_f64("objects/B/labels", labels(2, 2.))
            .with_f64("objects/C/coords", coords(4, 10., 9.))
            .with_f64("objects/C/labels", labels(4, 3.))
    }

    #[test]
    fn test_current_schema_ids_and_types() {
        let handler = Hdf5FileHandler::new(current_store());
        let objects = handler.read_objects().unwrap();

        assert_eq!(objects.len(), 9);
        let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());
        let types: Vec<i64> = objects.iter().map(|o| o.object_type).collect();
        assert_eq!(types, vec![1, 1, 1, 2, 2, 3, 3, 3, 3]);

        // t is truncated, labels come from the first column
        assert_eq!(objects[0].t, 0);
        assert_eq!(objects[4].t, 6);
        assert_eq!(objects[4].label, 2);
        assert_eq!(objects[4].x, 10.);
        assert!(objects.iter().all(|o| !o.dummy && o.probability == vec![0.]));
    }

    #[test]
    fn test_current_schema_row_mismatch() {
        let store = current_store().with_f64("objects/B/labels", labels(3, 2.));
        let err = Hdf5FileHandler::new(store).read_objects().unwrap_err();
        match err {
            TrackIoError::RowCountMismatch { location, coords, labels } => {
                assert_eq!(location, "objects/B");
                assert_eq!((coords, labels), (2, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_current_schema_requires_labels() {
        let store = MemoryStore::new("current.h5").with_f64("objects/A/coords", coords(3, 0., 0.));
        let err = Hdf5FileHandler::new(store).read_objects().unwrap_err();
        assert!(matches!(err, TrackIoError::NotFound { .. }));
    }

    #[test]
    fn test_legacy_frames_in_numeral_order() {
        let store = MemoryStore::new("legacy.h5")
            .with_f64("frames/frame_2/coords", coords(1, 2., 4.))
            .with_f64("frames/frame_10/coords", coords(2, 10., 6.))
            .with_f64("frames/frame_10/labels", labels(2, 5.))
            .with_f64("frames/frame_1/coords", coords(1, 1., 7.));
        let handler = LegacyHdf5FileHandler::new(store);
        let objects = handler.read_objects().unwrap();

        let frames: Vec<i64> = objects.iter().map(|o| o.t).collect();
        assert_eq!(frames, vec![1, 2, 10, 11]);
        let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        // type trusts the coords column
        let types: Vec<i64> = objects.iter().map(|o| o.object_type).collect();
        assert_eq!(types, vec![7, 4, 6, 6]);
        let labels: Vec<i64> = objects.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec![0, 0, 5, 5]);
    }

    #[test]
    fn test_frame_number() {
        assert_eq!(frame_number("frame_10"), Some(10));
        assert_eq!(frame_number("frame_007"), Some(7));
        assert_eq!(frame_number("frame"), None);
    }

    #[test]
    fn test_write_and_read_tracks() {
        let mut handler = Hdf5FileHandler::new(current_store());
        let batch = TrackBatch::References(vec![
            ReferenceTrack::new(vec![0, 1, 2]),
            ReferenceTrack::new(vec![8]),
            ReferenceTrack::new(vec![3, 4]),
        ]);
        handler.write_tracks(&batch).unwrap();

        assert_eq!(
            handler.read_tracks().unwrap(),
            vec![
                ReferenceTrack::new(vec![0, 1, 2]),
                ReferenceTrack::new(vec![8]),
                ReferenceTrack::new(vec![3, 4]),
            ]
        );
        // objects are untouched
        assert_eq!(handler.read_objects().unwrap().len(), 9);

        let objects = handler.read_objects().unwrap();
        let resolved = resolve_reference(&objects, &handler.read_tracks().unwrap()[2]).unwrap();
        assert_eq!(resolved.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_write_tracks_rejects_unknown_ids() {
        let mut handler = Hdf5FileHandler::new(current_store());
        let batch = TrackBatch::References(vec![ReferenceTrack::new(vec![0, 9])]);
        assert!(matches!(
            handler.write_tracks(&batch),
            Err(TrackIoError::InvalidValue { .. })
        ));
        assert!(handler.read_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_write_tracklets_fails_loudly() {
        let mut handler = Hdf5FileHandler::new(current_store());
        let track = Tracklet::new(1, vec![TrackObject::new(0, 0, 0., 0., 0.)]);
        let err = handler
            .write_tracks(&TrackBatch::Tracklets(vec![track]))
            .unwrap_err();
        assert!(err.is_type_error());
        assert!(handler.read_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_legacy_is_read_only() {
        let store = MemoryStore::new("legacy.h5").with_f64("frames/frame_1/coords", coords(1, 1., 0.));
        let mut handler = LegacyHdf5FileHandler::new(store);
        let batch = TrackBatch::References(vec![ReferenceTrack::new(vec![0])]);
        assert!(matches!(handler.write_tracks(&batch), Err(TrackIoError::Unsupported(_))));
    }

    #[test]
    fn test_dummies() {
        let mut handler = Hdf5FileHandler::new(current_store());
        assert!(handler.read_dummies().unwrap().is_empty());

        let mut gap = TrackObject::new(0, 4, 1.5, 2.5, 0.);
        gap.dummy = true;
        gap.object_type = 2;
        handler.write_dummies(&[gap.clone(), gap]).unwrap();

        let dummies = handler.read_dummies().unwrap();
        assert_eq!(dummies.len(), 2);
        assert_eq!(dummies[0].id, -1);
        assert_eq!(dummies[1].id, -2);
        assert!(dummies.iter().all(|d| d.dummy && d.t == 4 && d.object_type == 2));
        assert_eq!(dummies[0].x, 1.5);
    }

    #[test]
    fn test_close_twice() {
        let mut handler = Hdf5FileHandler::new(current_store());
        handler.close();
        handler.close();
        assert!(handler.is_closed());
        assert!(matches!(handler.read_objects(), Err(TrackIoError::Closed { .. })));

        let mut legacy = LegacyHdf5FileHandler::new(MemoryStore::new("legacy.h5"));
        legacy.close();
        legacy.close();
        assert!(legacy.is_closed());
    }

    #[test]
    fn test_handlers_behind_trait() {
        let handlers: Vec<Box<dyn TrackFileHandler>> = vec![
            Box::new(Hdf5FileHandler::new(current_store())),
            Box::new(LegacyHdf5FileHandler::new(
                MemoryStore::new("legacy.h5").with_f64("frames/frame_3/coords", coords(2, 3., 1.)),
            )),
        ];
        let counts: Vec<usize> = handlers.iter().map(|h| h.read_objects().unwrap().len()).collect();
        assert_eq!(counts, vec![9, 2]);
    }

    #[test]
    fn test_legacy_row_mismatch() {
        let store = MemoryStore::new("legacy.h5")
            .with_f64("frames/frame_1/coords", coords(2, 1., 0.))
            .with_f64("frames/frame_1/labels", labels(3, 1.));
        let err = LegacyHdf5FileHandler::new(store).read_objects().unwrap_err();
        match err {
            TrackIoError::RowCountMismatch { location, coords, labels } => {
                assert_eq!(location, "frames/frame_1");
                assert_eq!((coords, labels), (2, 3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(feature = "hdf5")]
    mod hdf5_file {
        use super::*;
        use tempfile::tempdir;

        /// Classes A, B and C with 3, 2 and 4 objects, created in that order.
        fn write_current_file(path: &Path) {
            let file = hdf5::File::create(path).unwrap();
            let objects = file.create_group("objects").unwrap();
            for (class, n, first_t, label) in [("A", 3, 0., 1.), ("B", 2, 5., 2.), ("C", 4, 10., 3.)] {
                let group = objects.create_group(class).unwrap();
                group
                    .new_dataset_builder()
                    .with_data(&coords(n, first_t, 9.))
                    .create("coords")
                    .unwrap();
                group
                    .new_dataset_builder()
                    .with_data(&labels(n, label))
                    .create("labels")
                    .unwrap();
            }
        }

        #[test]
        fn test_file_ids_and_types() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("objects.hdf5");
            write_current_file(&path);

            let mut handler = Hdf5FileHandler::<Hdf5Store>::open(&path).unwrap();
            let objects = handler.read_objects().unwrap();
            let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
            assert_eq!(ids, (0..9).collect::<Vec<_>>());
            let types: Vec<i64> = objects.iter().map(|o| o.object_type).collect();
            assert_eq!(types, vec![1, 1, 1, 2, 2, 3, 3, 3, 3]);
            assert_eq!(objects[3].label, 2);
            assert!(handler.read_tracks().unwrap().is_empty());
            handler.close();
        }

        #[test]
        fn test_export_keeps_objects() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("objects.hdf5");
            write_current_file(&path);

            let first = TrackBatch::References(vec![ReferenceTrack::new(vec![0, 1, 2])]);
            export_hdf(&path, &first, &[]).unwrap();

            // a second export replaces the tracks with a different width
            let second = TrackBatch::References(vec![
                ReferenceTrack::new(vec![8]),
                ReferenceTrack::new(vec![3, 4, 5, 6]),
            ]);
            let mut gap = TrackObject::new(0, 7, 1., 2., 0.);
            gap.object_type = 1;
            export_hdf(&path, &second, &[gap]).unwrap();

            let handler = Hdf5FileHandler::<Hdf5Store>::open(&path).unwrap();
            assert_eq!(
                handler.read_tracks().unwrap(),
                vec![ReferenceTrack::new(vec![8]), ReferenceTrack::new(vec![3, 4, 5, 6])]
            );
            assert_eq!(handler.read_dummies().unwrap().len(), 1);
            assert_eq!(handler.read_objects().unwrap().len(), 9);
        }

        #[test]
        fn test_export_missing_file() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("missing.hdf5");
            let batch = TrackBatch::References(vec![ReferenceTrack::new(vec![0])]);
            let err = export_hdf(&path, &batch, &[]).unwrap_err();
            assert!(matches!(err, TrackIoError::NotFound { .. }));
            assert!(!path.exists());
        }
    }
}
