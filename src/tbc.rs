//! File-backed TBC sources
//!
//! A TBC capture is a raw file of consecutive fields, each `width * height`
//! little-endian 16-bit samples, next to a JSON sidecar named after it with
//! `.json` appended. The sidecar holds the video parameters and one record per
//! field with its dropouts, quality metrics and (for first fields of discs
//! with frame numbers) the disc frame number.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Seek, SeekFrom};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::dropout::Dropout;
use crate::error::{Error, Result};
use crate::frame::{Quality, Sample};
use crate::geometry::{FieldGeometry, VideoStandard};
use crate::pool::{FrameSource, SourceField};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    video_parameters: VideoParameters,
    #[serde(default)]
    fields: Vec<FieldRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    system: VideoStandard,
    field_width: usize,
    field_height: usize,
    colour_burst_start: usize,
    colour_burst_end: usize,
    active_video_start: usize,
    active_video_end: usize,
    /// 0-based, inclusive
    #[serde(default)]
    first_active_field_line: Option<usize>,
    /// 0-based, exclusive
    #[serde(default)]
    last_active_field_line: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord {
    seq_no: usize,
    is_first_field: bool,
    #[serde(default)]
    drop_outs: DropoutLists,
    #[serde(default)]
    vits_metrics: Option<VitsMetrics>,
    #[serde(default)]
    disc_frame: Option<i32>,
}

/// Dropouts as three parallel arrays; field lines are 1-based
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropoutLists {
    #[serde(default)]
    startx: Vec<usize>,
    #[serde(default)]
    endx: Vec<usize>,
    #[serde(default)]
    field_line: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VitsMetrics {
    #[serde(rename = "bPSNR", default)]
    b_psnr: Option<f64>,
}

impl VideoParameters {
    fn geometry(&self) -> Result<FieldGeometry> {
        let defaults = match self.system {
            VideoStandard::Pal => FieldGeometry::pal(),
            VideoStandard::Ntsc => FieldGeometry::ntsc(),
        };
        let geometry = FieldGeometry {
            standard: self.system,
            width: self.field_width,
            height: self.field_height,
            colour_burst_start: self.colour_burst_start,
            colour_burst_end: self.colour_burst_end,
            active_video_start: self.active_video_start,
            active_video_end: self.active_video_end,
            first_active_line: self
                .first_active_field_line
                .unwrap_or(defaults.first_active_line),
            last_active_line: self
                .last_active_field_line
                .unwrap_or(defaults.last_active_line)
                .min(self.field_height),
        };
        geometry.validate()?;
        Ok(geometry)
    }
}

impl DropoutLists {
    fn to_dropouts(&self, seq_no: usize) -> Result<Vec<Dropout>> {
        if self.startx.len() != self.endx.len() || self.startx.len() != self.field_line.len() {
            return Err(Error::metadata(format!(
                "Field {} has mismatched dropout lists ({}, {}, {})",
                seq_no,
                self.startx.len(),
                self.endx.len(),
                self.field_line.len()
            )));
        }
        Ok(self
            .startx
            .iter()
            .zip(&self.endx)
            .zip(&self.field_line)
            .filter(|(_, &line)| line > 0)
            .map(|((&start, &end), &line)| Dropout::new(start, end, line - 1))
            .collect())
    }
}

/// Path of the JSON sidecar belonging to a TBC file
pub fn metadata_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// A TBC file opened as a [`FrameSource`]
pub struct TbcSource {
    path: PathBuf,
    geometry: FieldGeometry,
    fields: Vec<FieldRecord>,
    /// Sequential field numbers (first, second) of each frame
    frames: Vec<(usize, usize)>,
    disc_to_frame: HashMap<i32, usize>,
    disc_range: Option<RangeInclusive<i32>>,
    reader: Mutex<BufReader<File>>,
}

impl TbcSource {
    /// Open `path` and its `path.json` sidecar
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let json_path = metadata_path(&path);
        let json = fs::read_to_string(&json_path).map_err(|e| {
            Error::metadata(format!("Cannot read {}: {}", json_path.display(), e))
        })?;
        let metadata: Metadata = serde_json::from_str(&json)?;
        let geometry = metadata.video_parameters.geometry()?;

        let mut fields = metadata.fields;
        fields.sort_by_key(|f| f.seq_no);
        for (index, field) in fields.iter().enumerate() {
            if field.seq_no != index + 1 {
                return Err(Error::metadata(format!(
                    "Field sequence numbers are not contiguous at field {}",
                    field.seq_no
                )));
            }
        }

        let frames = pair_fields(&fields);
        let mut disc_to_frame = HashMap::new();
        for (index, &(first, _)) in frames.iter().enumerate() {
            if let Some(disc) = fields[first - 1].disc_frame {
                disc_to_frame.entry(disc).or_insert(index + 1);
            }
        }
        let disc_range = match (disc_to_frame.keys().min(), disc_to_frame.keys().max()) {
            (Some(&min), Some(&max)) => Some(min..=max),
            _ => None,
        };

        let file = File::open(&path)?;
        let available = file.metadata()?.len() / 2;
        let needed = (fields.len() * geometry.field_len()) as u64;
        if available < needed {
            warn!(
                "{} holds {} samples but its metadata describes {}",
                path.display(),
                available,
                needed
            );
        }

        info!(
            "Opened {}: {} {}x{} at {:.2} MHz, {} fields, {} frames",
            path.display(),
            geometry.standard.name(),
            geometry.width,
            geometry.height,
            geometry.standard.sample_rate() / 1e6,
            fields.len(),
            frames.len()
        );
        if let Some(range) = &disc_range {
            debug!("{} covers disc frames {}..={}", path.display(), range.start(), range.end());
        }

        Ok(TbcSource {
            path,
            geometry,
            fields,
            frames,
            disc_to_frame,
            disc_range,
            reader: Mutex::new(BufReader::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of fields described by the metadata
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn record(&self, field: usize) -> Result<&FieldRecord> {
        field
            .checked_sub(1)
            .and_then(|index| self.fields.get(index))
            .ok_or_else(|| {
                Error::source_err(format!(
                    "Field {} is out of range for {} ({} fields)",
                    field,
                    self.path.display(),
                    self.fields.len()
                ))
            })
    }
}

/// Pair each first field with the second field that immediately follows it
fn pair_fields(fields: &[FieldRecord]) -> Vec<(usize, usize)> {
    fields
        .windows(2)
        .filter(|pair| pair[0].is_first_field && !pair[1].is_first_field)
        .map(|pair| (pair[0].seq_no, pair[1].seq_no))
        .collect()
}

impl FrameSource for TbcSource {
    fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn field_numbers(&self, frame: usize) -> Result<(usize, usize)> {
        frame
            .checked_sub(1)
            .and_then(|index| self.frames.get(index))
            .copied()
            .ok_or_else(|| {
                Error::source_err(format!(
                    "Frame {} is out of range for {} ({} frames)",
                    frame,
                    self.path.display(),
                    self.frames.len()
                ))
            })
    }

    fn read_field(&self, field: usize) -> Result<SourceField> {
        let record = self.record(field)?;
        let len = self.geometry.field_len();
        let mut pixels: Vec<Sample> = vec![0; len];
        {
            let mut reader = self.reader.lock();
            reader.seek(SeekFrom::Start(((field - 1) * len * 2) as u64))?;
            reader.read_u16_into::<LittleEndian>(&mut pixels).map_err(|e| {
                Error::source_err(format!(
                    "Cannot read field {} from {}: {}",
                    field,
                    self.path.display(),
                    e
                ))
            })?;
        }

        Ok(SourceField {
            pixels,
            dropouts: record.drop_outs.to_dropouts(record.seq_no)?,
            quality: Quality(
                record
                    .vits_metrics
                    .as_ref()
                    .and_then(|m| m.b_psnr)
                    .unwrap_or(0.0),
            ),
        })
    }

    fn disc_frame(&self, frame: usize) -> Option<i32> {
        let (first, _) = self.field_numbers(frame).ok()?;
        self.fields[first - 1].disc_frame
    }

    fn sequential_frame(&self, disc_frame: i32) -> Option<usize> {
        self.disc_to_frame.get(&disc_frame).copied()
    }

    fn disc_frame_range(&self) -> Option<RangeInclusive<i32>> {
        self.disc_range.clone()
    }
}
