use crate::my_types::*;
use crate::track::{FateLabel, Tracklet};

/// Track ids grouped by fate label.
///
/// Keys keep the order in which each label was first seen, ids keep the
/// input order. Rebuilt from the tracks whenever it is needed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FateTable {
    entries: Vec<(FateLabel, Vec<TrackId>)>,
}

impl FateTable {
    pub fn from_tracks<'a, I>(tracks: I) -> Self
    where
        I: IntoIterator<Item = &'a Tracklet>,
    {
        let mut table = FateTable::default();
        for track in tracks {
            match table.entries.iter_mut().find(|(fate, _)| *fate == track.fate_label) {
                Some((_, ids)) => ids.push(track.id),
                None => table.entries.push((track.fate_label, vec![track.id])),
            }
        }
        table
    }

    pub fn get(&self, fate: FateLabel) -> Option<&[TrackId]> {
        self.entries
            .iter()
            .find(|(f, _)| *f == fate)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FateLabel, &[TrackId])> {
        self.entries.iter().map(|(fate, ids)| (*fate, ids.as_slice()))
    }

    pub fn labels(&self) -> Vec<FateLabel> {
        self.entries.iter().map(|(fate, _)| *fate).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
