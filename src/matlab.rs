//! MAT-file Level 5 writer for track data.
//!
//! The file holds four variables:
//!
//! ```text
//! tracks        N x 7 double   [x, y, frm, ID, parentID, rootID, class_label]
//! track_labels  1 x 7 cell     column names of `tracks`
//! class_labels  1 x 5 cell     classifier fates in canonical order
//! fate_table    1 x 1 struct   one field per fate, a row vector of track IDs
//! ```
//!
//! Little-endian, uncompressed, no sparse or complex data.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use ndarray as nd;

use crate::error::{Result, TrackIoError};
use crate::fate::FateTable;
use crate::my_types::*;
use crate::track::{FateLabel, Tracklet};

pub const TRACK_LABELS: [&str; 7] = ["x", "y", "frm", "ID", "parentID", "rootID", "class_label"];

const HEADER_TEXT_LEN: usize = 116;

// data types
const MI_INT8: u32 = 1;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;

// array classes
const MX_CELL_CLASS: u32 = 1;
const MX_STRUCT_CLASS: u32 = 2;
const MX_CHAR_CLASS: u32 = 4;
const MX_DOUBLE_CLASS: u32 = 6;

/// The array shapes this module writes.
#[derive(Clone, Debug, PartialEq)]
pub enum MatValue {
    Double(Matrixd),
    /// 1 x n cell array of strings
    StringCell(Vec<String>),
    /// 1 x 1 struct whose fields are double row vectors, in order
    RowVectorStruct(Vec<(String, Vec<f64>)>),
}

/// Append a tagged data element, padded to an 8 byte boundary.
fn push_element(buf: &mut Vec<u8>, data_type: u32, data: &[u8]) {
    buf.extend_from_slice(&data_type.to_le_bytes());
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
    let padding = (8 - data.len() % 8) % 8;
    buf.extend(std::iter::repeat(0u8).take(padding));
}

/// One miMATRIX element: flags, dimensions and name, then `contents`.
fn matrix_element(name: &str, class: u32, dims: [usize; 2], contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 48);

    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&class.to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &flags);

    let dims: Vec<u8> = dims.iter().flat_map(|d| (*d as i32).to_le_bytes()).collect();
    push_element(&mut body, MI_INT32, &dims);
    push_element(&mut body, MI_INT8, name.as_bytes());
    body.extend_from_slice(contents);

    let mut element = Vec::with_capacity(body.len() + 8);
    element.extend_from_slice(&MI_MATRIX.to_le_bytes());
    element.extend_from_slice(&(body.len() as u32).to_le_bytes());
    element.extend(body);
    element
}

fn double_element(name: &str, m: &Matrixd) -> Vec<u8> {
    // column-major
    let data: Vec<u8> = m.t().iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut contents = Vec::with_capacity(data.len() + 8);
    push_element(&mut contents, MI_DOUBLE, &data);
    matrix_element(name, MX_DOUBLE_CLASS, [m.nrows(), m.ncols()], &contents)
}

fn char_element(s: &str) -> Vec<u8> {
    let data: Vec<u8> = s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    let mut contents = Vec::with_capacity(data.len() + 8);
    push_element(&mut contents, MI_UINT16, &data);
    matrix_element("", MX_CHAR_CLASS, [1, data.len() / 2], &contents)
}

fn encode_variable(name: &str, value: &MatValue) -> Vec<u8> {
    match value {
        MatValue::Double(m) => double_element(name, m),
        MatValue::StringCell(strings) => {
            let contents: Vec<u8> = strings.iter().flat_map(|s| char_element(s)).collect();
            matrix_element(name, MX_CELL_CLASS, [1, strings.len()], &contents)
        }
        MatValue::RowVectorStruct(fields) => {
            let field_len = fields.iter().map(|(n, _)| n.len()).max().unwrap_or(0) + 1;
            let mut contents = Vec::new();
            // field name length uses the small element format
            contents.extend_from_slice(&((4u32 << 16) | MI_INT32).to_le_bytes());
            contents.extend_from_slice(&(field_len as i32).to_le_bytes());

            let mut names = vec![0u8; field_len * fields.len()];
            for (i, (field, _)) in fields.iter().enumerate() {
                names[i * field_len..i * field_len + field.len()].copy_from_slice(field.as_bytes());
            }
            push_element(&mut contents, MI_INT8, &names);

            for (_, values) in fields {
                let row = nd::Array2::from_shape_fn((1, values.len()), |(_, c)| values[c]);
                contents.extend(double_element("", &row));
            }
            matrix_element(name, MX_STRUCT_CLASS, [1, 1], &contents)
        }
    }
}

fn header() -> [u8; 128] {
    let mut header = [b' '; 128];
    let text = b"MATLAB 5.0 MAT-file, written by track-io";
    header[..text.len()].copy_from_slice(text);
    // subsystem data offset
    header[HEADER_TEXT_LEN..HEADER_TEXT_LEN + 8].fill(0);
    header[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
    header[126..128].copy_from_slice(b"IM");
    header
}

/// Write named variables into a MAT-file.
pub fn write_mat_file(filename: &Path, variables: &[(&str, MatValue)]) -> Result<()> {
    let file = File::create(filename).map_err(|e| TrackIoError::io(filename, e))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header()).map_err(|e| TrackIoError::io(filename, e))?;
    for (name, value) in variables {
        writer
            .write_all(&encode_variable(name, value))
            .map_err(|e| TrackIoError::io(filename, e))?;
    }
    writer.flush().map_err(|e| TrackIoError::io(filename, e))
}

/// Stack every object of every track into one N x 7 matrix.
///
/// Tracks keep the input order and objects the per-track order.
pub fn stack_tracks(tracks: &[Tracklet]) -> Result<Matrixd> {
    let rows: Vec<[f64; 7]> = tracks.iter().flat_map(|t| t.to_rows()).collect();
    let n_rows = rows.len();
    nd::Array2::from_shape_vec((n_rows, 7), rows.into_iter().flatten().collect())
        .map_err(|e| TrackIoError::invalid_value("tracks", e.to_string()))
}

fn fate_struct(table: &FateTable) -> MatValue {
    MatValue::RowVectorStruct(
        table
            .iter()
            .map(|(fate, ids)| (fate.to_string(), ids.iter().map(|id| *id as f64).collect()))
            .collect(),
    )
}

fn string_cell(strings: &[&str]) -> MatValue {
    MatValue::StringCell(strings.iter().map(|s| s.to_string()).collect())
}

/// MATLAB exporter for track data.
pub fn export_matlab(filename: impl AsRef<Path>, tracks: &[Tracklet]) -> Result<()> {
    let filename = filename.as_ref();
    if tracks.is_empty() {
        return Err(TrackIoError::EmptyInput);
    }
    Tracklet::validate_all(tracks)?;

    let matrix = stack_tracks(tracks)?;
    let class_labels: Vec<&str> = FateLabel::CLASSES.iter().map(|f| f.as_str()).collect();
    let variables = [
        ("tracks", MatValue::Double(matrix)),
        ("track_labels", string_cell(&TRACK_LABELS)),
        ("class_labels", string_cell(&class_labels)),
        ("fate_table", fate_struct(&FateTable::from_tracks(tracks))),
    ];

    info!("Writing {} tracks to: {}", tracks.len(), filename.display());
    write_mat_file(filename, &variables)
}
