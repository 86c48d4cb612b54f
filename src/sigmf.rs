//! SigMF recording loader.
//!
//! A recording is a `.sigmf-meta` JSON document next to a `.sigmf-data` file of raw samples.
//! Only the fields the analysis needs are typed; everything else is kept in the
//! `extensions` maps so it can still be shown verbatim.
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use crate::dsp::{AnalysisError, SampleBuffer};
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigMfGlobal {
    #[serde(rename = "core:datatype")]
    pub datatype: String,
    #[serde(rename = "core:sample_rate")]
    pub sample_rate: f64,
    #[serde(rename = "core:version", default)]
    pub version: String,
    #[serde(rename = "core:num_channels", skip_serializing_if = "Option::is_none")]
    pub num_channels: Option<u32>,
    /// Byte offset of the first sample in the data file.
    #[serde(rename = "core:offset", skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(rename = "core:description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "core:author", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "core:hw", skip_serializing_if = "Option::is_none")]
    pub hw: Option<String>,
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigMfCapture {
    #[serde(rename = "core:sample_start", default)]
    pub sample_start: u64,
    /// Center frequency in Hz.
    #[serde(rename = "core:frequency", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(rename = "core:datetime", skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigMfAnnotation {
    #[serde(rename = "core:sample_start")]
    pub sample_start: u64,
    #[serde(rename = "core:sample_count", default)]
    pub sample_count: u64,
    #[serde(rename = "core:freq_lower_edge", skip_serializing_if = "Option::is_none")]
    pub freq_lower_edge: Option<f64>,
    #[serde(rename = "core:freq_upper_edge", skip_serializing_if = "Option::is_none")]
    pub freq_upper_edge: Option<f64>,
    #[serde(rename = "core:label", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "core:comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigMfMeta {
    pub global: SigMfGlobal,
    #[serde(default)]
    pub captures: Vec<SigMfCapture>,
    #[serde(default)]
    pub annotations: Vec<SigMfAnnotation>,
}
impl SigMfMeta {
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let meta: SigMfMeta = serde_json::from_str(text)?;
        meta.validate()?;
        Ok(meta)
    }
    fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.global.sample_rate.is_finite() && self.global.sample_rate > 0.0) {
            return Err(AnalysisError::Metadata(format!(
                "core:sample_rate must be positive, got {}",
                self.global.sample_rate
            )));
        }
        if self.captures.len() > 1 {
            log::warn!(
                "recording has {} captures; only the first is used",
                self.captures.len()
            );
        }
        Ok(())
    }
    /// `core:frequency` of the first capture.
    pub fn center_frequency(&self) -> Option<f64> {
        self.captures.first().and_then(|c| c.frequency)
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Component {
    F32,
    F64,
    I16,
    I8,
    U8,
}
/// Complex sample layout named by `core:datatype`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigMfDatatype {
    component: Component,
    big_endian: bool,
}
impl SigMfDatatype {
    pub fn parse(datatype: &str) -> Result<Self, AnalysisError> {
        let (base, big_endian) = match datatype.rsplit_once('_') {
            Some((base, "le")) => (base, false),
            Some((base, "be")) => (base, true),
            _ => (datatype, false),
        };
        let component = match base {
            "cf32" => Component::F32,
            "cf64" => Component::F64,
            "ci16" => Component::I16,
            "ci8" => Component::I8,
            "cu8" => Component::U8,
            _ => {
                return Err(AnalysisError::Decode(format!(
                    "unsupported SigMF datatype {datatype:?}"
                )))
            }
        };
        Ok(Self {
            component,
            big_endian,
        })
    }
    /// Bytes per complex sample.
    pub fn sample_size(&self) -> usize {
        2 * match self.component {
            Component::F32 => 4,
            Component::F64 => 8,
            Component::I16 => 2,
            Component::I8 | Component::U8 => 1,
        }
    }
    /// Converts raw bytes into samples; integers are scaled into `[-1, 1)`.
    /// A trailing partial sample is ignored.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Complex64> {
        let half = self.sample_size() / 2;
        bytes
            .chunks_exact(self.sample_size())
            .map(|b| Complex64::new(self.component(&b[..half]), self.component(&b[half..])))
            .collect()
    }
    fn component(&self, b: &[u8]) -> f64 {
        let mut raw = [0u8; 8];
        raw[..b.len()].copy_from_slice(b);
        if self.big_endian {
            raw[..b.len()].reverse();
        }
        match self.component {
            Component::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
            Component::F64 => f64::from_le_bytes(raw),
            Component::I16 => i16::from_le_bytes([raw[0], raw[1]]) as f64 / 32768.0,
            Component::I8 => raw[0] as i8 as f64 / 128.0,
            Component::U8 => (raw[0] as f64 - 128.0) / 128.0,
        }
    }
}
/// A recording read fully into memory.
#[derive(Debug, Clone)]
pub struct SigMfRecording {
    pub meta: SigMfMeta,
    pub data_path: PathBuf,
    samples: Vec<Complex64>,
}
impl SigMfRecording {
    /// Opens a recording from its `.sigmf-meta` path, `.sigmf-data` path or base name.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let (meta_path, data_path) = recording_paths(path.as_ref());
        let meta: SigMfMeta = serde_json::from_reader(BufReader::new(File::open(&meta_path)?))?;
        meta.validate()?;
        let bytes = fs::read(&data_path)?;
        let samples = Self::decode_data(&meta, &bytes)?;
        log::info!(
            "loaded {} samples from {} ({}, {} Hz)",
            samples.len(),
            data_path.display(),
            meta.global.datatype,
            meta.global.sample_rate
        );
        Ok(Self {
            meta,
            data_path,
            samples,
        })
    }
    /// Builds a recording from already-read metadata and data bytes.
    pub fn from_parts(meta: SigMfMeta, bytes: &[u8]) -> Result<Self, AnalysisError> {
        meta.validate()?;
        let samples = Self::decode_data(&meta, bytes)?;
        Ok(Self {
            meta,
            data_path: PathBuf::new(),
            samples,
        })
    }
    fn decode_data(meta: &SigMfMeta, bytes: &[u8]) -> Result<Vec<Complex64>, AnalysisError> {
        let datatype = SigMfDatatype::parse(&meta.global.datatype)?;
        let offset = meta.global.offset.unwrap_or(0) as usize;
        let payload = bytes.get(offset..).ok_or_else(|| {
            AnalysisError::Metadata(format!(
                "core:offset {offset} is past the end of {} data bytes",
                bytes.len()
            ))
        })?;
        let dangling = payload.len() % datatype.sample_size();
        if dangling != 0 {
            log::warn!("ignoring {dangling} trailing byte(s) of a partial sample");
        }
        Ok(datatype.decode(payload))
    }
    /// Writes `meta` and raw `data` as a recording pair named after `base`, the same way
    /// [`SigMfRecording::open`] resolves it. Returns the data file path.
    pub fn write(
        base: impl AsRef<Path>,
        meta: &SigMfMeta,
        data: &[u8],
    ) -> Result<PathBuf, AnalysisError> {
        meta.validate()?;
        let (meta_path, data_path) = recording_paths(base.as_ref());
        fs::write(&data_path, data)?;
        fs::write(&meta_path, serde_json::to_string_pretty(meta)?)?;
        log::info!("wrote {} data byte(s) to {}", data.len(), data_path.display());
        Ok(data_path)
    }
    pub fn samples(&self) -> &[Complex64] {
        &self.samples
    }
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
    /// Copies the samples into an analysis buffer, tuned to the capture frequency when
    /// `rf_frequencies` is set.
    pub fn to_buffer(&self, rf_frequencies: bool) -> Result<SampleBuffer, AnalysisError> {
        let center = if rf_frequencies {
            self.meta.center_frequency()
        } else {
            None
        };
        Ok(SampleBuffer::new(self.samples.clone(), self.meta.global.sample_rate)?
            .with_center_frequency(center))
    }
}
fn recording_paths(path: &Path) -> (PathBuf, PathBuf) {
    let base = match path.extension().and_then(|e| e.to_str()) {
        Some("sigmf-meta") | Some("sigmf-data") => path.with_extension(""),
        _ => path.to_path_buf(),
    };
    let with_suffix = |suffix: &str| {
        let mut name = base.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    };
    (with_suffix(".sigmf-meta"), with_suffix(".sigmf-data"))
}
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    const META: &str = r#"{
        "global": {
            "core:datatype": "ci16_le",
            "core:sample_rate": 2000000,
            "core:version": "1.0.0",
            "core:author": "bench",
            "he360:rx_gain": 40
        },
        "captures": [
            {"core:sample_start": 0, "core:frequency": 915000000.0}
        ],
        "annotations": [
            {"core:sample_start": 10, "core:sample_count": 100, "core:label": "burst"}
        ]
    }"#;
    #[test]
    fn parses_core_fields_and_keeps_extensions() {
        let meta = SigMfMeta::from_json(META).unwrap();
        assert_eq!(meta.global.datatype, "ci16_le");
        assert_eq!(meta.global.sample_rate, 2.0e6);
        assert_eq!(meta.center_frequency(), Some(915.0e6));
        assert_eq!(meta.annotations[0].label.as_deref(), Some("burst"));
        assert_eq!(meta.global.extensions["he360:rx_gain"], 40);
    }
    #[test]
    fn rejects_bad_sample_rate() {
        let text = META.replace("2000000", "0");
        assert!(matches!(
            SigMfMeta::from_json(&text),
            Err(AnalysisError::Metadata(_))
        ));
    }
    #[test]
    fn decodes_integer_and_float_layouts() {
        let ci16 = SigMfDatatype::parse("ci16_le").unwrap();
        let bytes = [0x00, 0x40, 0x00, 0xc0];
        assert_eq!(ci16.decode(&bytes), vec![Complex64::new(0.5, -0.5)]);
        let cu8 = SigMfDatatype::parse("cu8").unwrap();
        assert_eq!(cu8.decode(&[128, 0, 255]), vec![Complex64::new(0.0, -1.0)]);
        let ci8 = SigMfDatatype::parse("ci8").unwrap();
        assert_eq!(ci8.decode(&[0x40, 0x80]), vec![Complex64::new(0.5, -1.0)]);
        let cf32_be = SigMfDatatype::parse("cf32_be").unwrap();
        let mut be = 1.5f32.to_be_bytes().to_vec();
        be.extend_from_slice(&(-2.0f32).to_be_bytes());
        assert_eq!(cf32_be.decode(&be), vec![Complex64::new(1.5, -2.0)]);
        let cf64 = SigMfDatatype::parse("cf64_le").unwrap();
        assert_eq!(cf64.sample_size(), 16);
        assert!(SigMfDatatype::parse("rf32_le").is_err());
    }
    #[test]
    fn opens_meta_and_data_pair() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("capture");
        fs::write(base.with_extension("sigmf-meta"), META).unwrap();
        let mut data = Vec::new();
        for k in 0..64i16 {
            data.extend_from_slice(&(k * 256).to_le_bytes());
            data.extend_from_slice(&(-k * 256).to_le_bytes());
        }
        data.push(0xff);
        fs::write(base.with_extension("sigmf-data"), &data).unwrap();
        let recording = SigMfRecording::open(base.with_extension("sigmf-data")).unwrap();
        assert_eq!(recording.sample_count(), 64);
        assert_eq!(recording.samples()[2], Complex64::new(512.0 / 32768.0, -512.0 / 32768.0));
        let buffer = recording.to_buffer(true).unwrap();
        assert_eq!(buffer.center_frequency_hz(), Some(915.0e6));
        assert_eq!(recording.to_buffer(false).unwrap().center_frequency_hz(), None);
    }
    #[test]
    fn offset_skips_header_bytes() {
        let mut meta = SigMfMeta::from_json(META).unwrap();
        meta.global.offset = Some(4);
        let bytes = [9, 9, 9, 9, 0x00, 0x40, 0x00, 0x40];
        let recording = SigMfRecording::from_parts(meta.clone(), &bytes).unwrap();
        assert_eq!(recording.samples(), &[Complex64::new(0.5, 0.5)]);
        meta.global.offset = Some(100);
        assert!(SigMfRecording::from_parts(meta, &bytes).is_err());
    }
    #[test]
    fn written_pair_opens_under_the_same_base() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("cap.v2");
        let meta = SigMfMeta::from_json(META).unwrap();
        let data_path = SigMfRecording::write(&base, &meta, &[0x00, 0x40, 0x00, 0xc0]).unwrap();
        assert_eq!(data_path, dir.path().join("cap.v2.sigmf-data"));
        assert!(dir.path().join("cap.v2.sigmf-meta").exists());
        let recording = SigMfRecording::open(&base).unwrap();
        assert_eq!(recording.samples(), &[Complex64::new(0.5, -0.5)]);
        assert_eq!(recording.meta.annotations.len(), 1);
        let meta_path = dir.path().join("cap.v2.sigmf-meta");
        assert_eq!(SigMfRecording::open(meta_path).unwrap().sample_count(), 1);
    }
    #[test]
    fn missing_files_are_io_errors() {
        let dir = TempDir::new().unwrap();
        let err = SigMfRecording::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
