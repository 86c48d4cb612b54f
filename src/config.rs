use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::dsp::peaks::DEFAULT_PROMINENCE_DB;
use crate::dsp::{AnalysisError, Detrend, WindowKind};
use crate::sigmf::SigMfMeta;
/// Block sizes offered for the spectrogram, 32 through 16384.
pub const FFT_SIZE_OPTIONS: [usize; 10] = [32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384];
/// Parameters for one analysis pass.
///
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Overrides `core:sample_rate`.
    pub sample_rate_hz: Option<f64>,
    /// Overrides the first capture's `core:frequency`.
    pub center_frequency_hz: Option<f64>,
    /// Label the frequency axis in RF terms (offset by the capture frequency).
    pub rf_frequencies: bool,
    /// Spectrogram block (FFT) size.
    pub block_size: usize,
    /// Welch segment size for the PSD view.
    pub psd_segment_size: usize,
    /// Welch overlap in samples; half a segment when unset.
    pub psd_overlap: Option<usize>,
    pub prominence: Option<f64>,
    pub min_bandwidth_hz: Option<f64>,
    /// Run peak detection on the PSD.
    pub analyze: bool,
    /// Sample range `[start, end)` used for the PSD and IQ views.
    pub slice: Option<(usize, usize)>,
    pub iq_decimation: usize,
    /// Recordings longer than this are truncated on load.
    pub max_samples: Option<usize>,
    pub window: WindowKind,
    pub detrend: Detrend,
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: None,
            center_frequency_hz: None,
            rf_frequencies: true,
            block_size: 1024,
            psd_segment_size: 8192,
            psd_overlap: None,
            prominence: Some(DEFAULT_PROMINENCE_DB),
            min_bandwidth_hz: None,
            analyze: true,
            slice: None,
            iq_decimation: 10,
            max_samples: Some(1_000_000),
            window: WindowKind::default(),
            detrend: Detrend::default(),
        }
    }
}
/// Sample rate and tuning after applying config overrides to recording metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedParams {
    pub sample_rate_hz: f64,
    pub center_frequency_hz: Option<f64>,
}
impl AnalysisConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
    pub fn resolve(&self, meta: &SigMfMeta) -> ResolvedParams {
        let center_frequency_hz = if self.rf_frequencies {
            self.center_frequency_hz.or_else(|| meta.center_frequency())
        } else {
            None
        };
        ResolvedParams {
            sample_rate_hz: self.sample_rate_hz.unwrap_or(meta.global.sample_rate),
            center_frequency_hz,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn meta() -> SigMfMeta {
        SigMfMeta::from_json(
            r#"{"global": {"core:datatype": "cf32_le", "core:sample_rate": 1e6},
                "captures": [{"core:sample_start": 0, "core:frequency": 2.4e9}]}"#,
        )
        .unwrap()
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"block_size": 256, "slice": [10, 20], "window": "hamming"}"#)
                .unwrap();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.slice, Some((10, 20)));
        assert_eq!(config.window, WindowKind::Hamming);
        assert_eq!(config.psd_segment_size, 8192);
        assert_eq!(config.psd_overlap, None);
        assert_eq!(config.prominence, Some(DEFAULT_PROMINENCE_DB));
        assert!(config.rf_frequencies);
    }
    #[test]
    fn resolve_prefers_overrides() {
        let meta = meta();
        let resolved = AnalysisConfig::default().resolve(&meta);
        assert_eq!(resolved.sample_rate_hz, 1e6);
        assert_eq!(resolved.center_frequency_hz, Some(2.4e9));
        let config = AnalysisConfig {
            sample_rate_hz: Some(250e3),
            center_frequency_hz: Some(100e6),
            ..AnalysisConfig::default()
        };
        let resolved = config.resolve(&meta);
        assert_eq!(resolved.sample_rate_hz, 250e3);
        assert_eq!(resolved.center_frequency_hz, Some(100e6));
        let baseband = AnalysisConfig {
            rf_frequencies: false,
            ..config
        };
        assert_eq!(baseband.resolve(&meta).center_frequency_hz, None);
    }
}
