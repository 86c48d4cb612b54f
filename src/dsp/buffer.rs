use rustfft::num_complex::Complex64;
use crate::dsp::AnalysisError;
/// Complex baseband samples with the rate and tuning they were captured at.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Complex64>,
    sample_rate_hz: f64,
    center_frequency_hz: Option<f64>,
}
impl SampleBuffer {
    pub fn new(samples: Vec<Complex64>, sample_rate_hz: f64) -> Result<Self, AnalysisError> {
        validate_sample_rate(sample_rate_hz)?;
        Ok(Self {
            samples,
            sample_rate_hz,
            center_frequency_hz: None,
        })
    }
    pub fn with_center_frequency(mut self, center_frequency_hz: Option<f64>) -> Self {
        self.center_frequency_hz = center_frequency_hz;
        self
    }
    pub fn samples(&self) -> &[Complex64] {
        &self.samples
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn center_frequency_hz(&self) -> Option<f64> {
        self.center_frequency_hz
    }
    /// Center frequency used for axis construction; absent means baseband.
    pub fn frequency_offset_hz(&self) -> f64 {
        self.center_frequency_hz.unwrap_or(0.0)
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz
    }
    /// Samples in `start..end`, both ends clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> &[Complex64] {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        &self.samples[start..end]
    }
    /// Drops everything past `limit` samples. Returns `true` when samples were removed.
    pub fn truncate(&mut self, limit: usize) -> bool {
        if self.samples.len() <= limit {
            return false;
        }
        log::warn!(
            "truncating samples for performance {} -> {}",
            self.samples.len(),
            limit
        );
        self.samples.truncate(limit);
        true
    }
}
pub(crate) fn validate_sample_rate(sample_rate_hz: f64) -> Result<(), AnalysisError> {
    if sample_rate_hz.is_finite() && sample_rate_hz > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSampleRate)
    }
}
