use ndarray::{Array2, ArrayView1};
use rustfft::num_complex::Complex64;
use serde::Serialize;
use crate::dsp::buffer::validate_sample_rate;
use crate::dsp::psd::{frequency_axis, linspace, PsdEstimator};
use crate::dsp::AnalysisError;
use crate::sigmf::SigMfAnnotation;
/// Time-frequency image: one PSD row per non-overlapping block.
#[derive(Clone, Debug, Serialize)]
pub struct Spectrogram {
    /// dB values indexed `[row, bin]`.
    pub power_db: Array2<f64>,
    pub frequencies_hz: Vec<f64>,
    /// One entry per row, spanning `0 ..= input_len / sample_rate`.
    pub times_s: Vec<f64>,
    pub block_size: usize,
    pub sample_rate_hz: f64,
}
impl Spectrogram {
    pub fn num_rows(&self) -> usize {
        self.power_db.nrows()
    }
    pub fn is_empty(&self) -> bool {
        self.power_db.nrows() == 0
    }
    pub fn block_duration_s(&self) -> f64 {
        self.block_size as f64 / self.sample_rate_hz
    }
    /// Finite dB range over the image, ignoring `-inf` bins.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.power_db
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
    /// Overlay rectangle for a SigMF annotation on this image's axes.
    pub fn annotation_box(&self, annotation: &SigMfAnnotation) -> AnnotationBox {
        let start_s = annotation.sample_start as f64 / self.sample_rate_hz;
        let stop_s =
            (annotation.sample_start + annotation.sample_count) as f64 / self.sample_rate_hz;
        let first = self.frequencies_hz.first().copied().unwrap_or(0.0);
        let last = self.frequencies_hz.last().copied().unwrap_or(0.0);
        let (freq_lower_hz, freq_upper_hz) =
            match (annotation.freq_lower_edge, annotation.freq_upper_edge) {
                (Some(lower), Some(upper)) => (lower, upper),
                _ => (first, last),
            };
        AnnotationBox {
            label: annotation.label.clone().unwrap_or_default(),
            start_s,
            stop_s,
            freq_lower_hz,
            freq_upper_hz,
        }
    }
}
/// Rectangle in (time, frequency) marking an annotated region.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationBox {
    pub label: String,
    pub start_s: f64,
    pub stop_s: f64,
    pub freq_lower_hz: f64,
    pub freq_upper_hz: f64,
}
/// Tiles a sample sequence into blocks and estimates one spectrum per block.
#[derive(Clone, Debug, Default)]
pub struct SpectrogramBuilder {
    estimator: PsdEstimator,
}
impl SpectrogramBuilder {
    pub fn new(estimator: PsdEstimator) -> Self {
        Self { estimator }
    }
    /// Trailing samples that do not fill a whole block are dropped. A block larger than the
    /// input gives an image with zero rows and an empty frequency axis.
    pub fn build(
        &self,
        samples: &[Complex64],
        sample_rate_hz: f64,
        block_size: usize,
        center_freq_hz: f64,
    ) -> Result<Spectrogram, AnalysisError> {
        validate_sample_rate(sample_rate_hz)?;
        if block_size == 0 {
            return Err(AnalysisError::InvalidBlockSize(block_size));
        }
        let num_rows = samples.len() / block_size;
        if num_rows == 0 {
            log::debug!(
                "spectrogram: block size {block_size} exceeds {} sample(s), no rows",
                samples.len()
            );
            return Ok(Spectrogram {
                power_db: Array2::zeros((0, 0)),
                frequencies_hz: Vec::new(),
                times_s: Vec::new(),
                block_size,
                sample_rate_hz,
            });
        }
        let frequencies_hz = frequency_axis(sample_rate_hz, center_freq_hz, block_size);
        let times_s = linspace(0.0, samples.len() as f64 / sample_rate_hz, num_rows);
        let mut power_db = Array2::<f64>::zeros((num_rows, block_size));
        let plan = self.estimator.plan(block_size);
        for (block, mut row) in samples
            .chunks_exact(block_size)
            .zip(power_db.outer_iter_mut())
        {
            let db = plan.power_db(block);
            row.assign(&ArrayView1::from(&db[..]));
        }
        log::debug!(
            "spectrogram: {num_rows} row(s) x {block_size} bins, {} sample(s) dropped",
            samples.len() - num_rows * block_size
        );
        Ok(Spectrogram {
            power_db,
            frequencies_hz,
            times_s,
            block_size,
            sample_rate_hz,
        })
    }
}
