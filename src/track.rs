use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackIoError};
use crate::my_types::*;

/// Terminal classification of a track's end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FateLabel {
    Interphase,
    Prometaphase,
    Metaphase,
    Anaphase,
    Apoptosis,
    /// The track end was never classified.
    Undefined,
}

impl FateLabel {
    /// The five classifier fates in canonical order.
    pub const CLASSES: [FateLabel; 5] = [
        FateLabel::Interphase,
        FateLabel::Prometaphase,
        FateLabel::Metaphase,
        FateLabel::Anaphase,
        FateLabel::Apoptosis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FateLabel::Interphase => "interphase",
            FateLabel::Prometaphase => "prometaphase",
            FateLabel::Metaphase => "metaphase",
            FateLabel::Anaphase => "anaphase",
            FateLabel::Apoptosis => "apoptosis",
            FateLabel::Undefined => "undefined",
        }
    }
}

impl fmt::Display for FateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition channel a track was segmented from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[serde(rename = "GFP")]
    Gfp,
    #[serde(rename = "RFP")]
    Rfp,
    #[serde(rename = "iRFP")]
    Irfp,
    #[serde(rename = "Phase")]
    Phase,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Gfp => "GFP",
            CellType::Rfp => "RFP",
            CellType::Irfp => "iRFP",
            CellType::Phase => "Phase",
        }
    }

    /// Tag used in archive file names; an absent cell type is spelled `None`.
    pub fn tag(cell_type: Option<CellType>) -> &'static str {
        cell_type.map(|c| c.as_str()).unwrap_or("None")
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = TrackIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GFP" => Ok(CellType::Gfp),
            "RFP" => Ok(CellType::Rfp),
            "iRFP" => Ok(CellType::Irfp),
            "Phase" => Ok(CellType::Phase),
            _ => Err(TrackIoError::invalid_value(
                "cell_type",
                format!("`{s}` is not one of GFP, RFP, iRFP, Phase"),
            )),
        }
    }
}

fn default_probability() -> Vec<f64> {
    vec![0.]
}

/// One detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: ObjectId,
    /// frame index
    pub t: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dummy: bool,
    #[serde(default)]
    pub label: i64,
    #[serde(rename = "type")]
    pub object_type: i64,
    #[serde(default = "default_probability")]
    pub probability: Vec<f64>,
}

impl TrackObject {
    pub fn new(id: ObjectId, t: i64, x: f64, y: f64, z: f64) -> Self {
        TrackObject {
            id,
            t,
            x,
            y,
            z,
            dummy: false,
            label: 0,
            object_type: 0,
            probability: default_probability(),
        }
    }
}

/// One reconstructed trajectory. Objects are kept in the caller's order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tracklet {
    #[serde(rename = "ID")]
    pub id: TrackId,
    #[serde(rename = "parentID")]
    pub parent_id: TrackId,
    #[serde(rename = "rootID")]
    pub root_id: TrackId,
    pub fate_label: FateLabel,
    #[serde(default)]
    pub cell_type: Option<CellType>,
    pub objects: Vec<TrackObject>,
    /// Provenance, only set when loaded from a per-track archive.
    #[serde(default, skip_serializing)]
    pub filename: Option<String>,
}

impl Tracklet {
    /// A self-rooted track with no parent.
    pub fn new(id: TrackId, objects: Vec<TrackObject>) -> Self {
        Tracklet {
            id,
            parent_id: 0,
            root_id: id,
            fate_label: FateLabel::Undefined,
            cell_type: None,
            objects,
            filename: None,
        }
    }

    pub fn with_lineage(mut self, parent_id: TrackId, root_id: TrackId) -> Self {
        self.parent_id = parent_id;
        self.root_id = root_id;
        self
    }

    pub fn with_fate(mut self, fate_label: FateLabel) -> Self {
        self.fate_label = fate_label;
        self
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Fails for a track that must not be written.
    pub fn validate(&self) -> Result<()> {
        if self.objects.is_empty() {
            return Err(TrackIoError::EmptyTrack { id: self.id });
        }
        Ok(())
    }

    /// Validate every track of an export and require unique IDs.
    pub fn validate_all(tracks: &[Tracklet]) -> Result<()> {
        let mut seen = HashSet::with_capacity(tracks.len());
        for track in tracks {
            track.validate()?;
            if !seen.insert(track.id) {
                return Err(TrackIoError::invalid_value(
                    "ID",
                    format!("track {} appears more than once", track.id),
                ));
            }
        }
        Ok(())
    }

    /// One `[x, y, frm, ID, parentID, rootID, class_label]` row per object.
    pub fn to_rows(&self) -> Vec<[f64; 7]> {
        self.objects
            .iter()
            .map(|o| {
                [
                    o.x,
                    o.y,
                    o.t as f64,
                    self.id as f64,
                    self.parent_id as f64,
                    self.root_id as f64,
                    o.label as f64,
                ]
            })
            .collect()
    }
}

/// A track expressed only as object ids of an existing objects dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceTrack(pub Vec<ObjectId>);

impl ReferenceTrack {
    pub fn new(refs: Vec<ObjectId>) -> Self {
        ReferenceTrack(refs)
    }

    pub fn refs(&self) -> &[ObjectId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ObjectId>> for ReferenceTrack {
    fn from(refs: Vec<ObjectId>) -> Self {
        ReferenceTrack(refs)
    }
}

/// Element accepted by the generic exporter.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackRecord {
    Tracklet(Tracklet),
    Reference(ReferenceTrack),
}

impl TrackRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            TrackRecord::Tracklet(_) => TRACKLET_KIND,
            TrackRecord::Reference(_) => REFERENCE_KIND,
        }
    }

    pub fn as_tracklet(&self) -> Option<&Tracklet> {
        match self {
            TrackRecord::Tracklet(track) => Some(track),
            TrackRecord::Reference(_) => None,
        }
    }
}

pub(crate) const TRACKLET_KIND: &str = "tracklet";
pub(crate) const REFERENCE_KIND: &str = "reference track";

impl From<Tracklet> for TrackRecord {
    fn from(track: Tracklet) -> Self {
        TrackRecord::Tracklet(track)
    }
}

impl From<ReferenceTrack> for TrackRecord {
    fn from(track: ReferenceTrack) -> Self {
        TrackRecord::Reference(track)
    }
}

/// Input of the HDF5 write path, resolved by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackBatch {
    References(Vec<ReferenceTrack>),
    Tracklets(Vec<Tracklet>),
}

impl TrackBatch {
    /// Split a record list into a homogeneous batch.
    pub fn from_records(records: &[TrackRecord]) -> Result<TrackBatch> {
        let first = records.first().ok_or(TrackIoError::EmptyInput)?;
        let mut batch = match first {
            TrackRecord::Tracklet(_) => TrackBatch::Tracklets(Vec::with_capacity(records.len())),
            TrackRecord::Reference(_) => TrackBatch::References(Vec::with_capacity(records.len())),
        };
        for (index, record) in records.iter().enumerate() {
            match (&mut batch, record) {
                (TrackBatch::Tracklets(v), TrackRecord::Tracklet(t)) => v.push(t.clone()),
                (TrackBatch::References(v), TrackRecord::Reference(r)) => v.push(r.clone()),
                _ => {
                    return Err(TrackIoError::MixedBatch {
                        index,
                        found: record.kind(),
                    })
                }
            }
        }
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        match self {
            TrackBatch::References(v) => v.len(),
            TrackBatch::Tracklets(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
