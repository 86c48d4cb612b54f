use std::f64::consts::PI;
use std::sync::Arc;
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use crate::dsp::buffer::validate_sample_rate;
use crate::dsp::AnalysisError;
/// Taper applied to each Welch segment before the FFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}
impl WindowKind {
    /// Periodic (DFT-even) coefficients of length `size`.
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        if size == 1 {
            return vec![1.0];
        }
        let n = size as f64;
        (0..size)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / n;
                match self {
                    WindowKind::Hann => 0.5 - 0.5 * x.cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowKind::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect()
    }
}
/// Per-segment trend removal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detrend {
    /// Subtract the segment mean.
    #[default]
    Constant,
    None,
}
/// Power spectral density on a linear, ascending frequency axis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PsdResult {
    pub frequencies_hz: Vec<f64>,
    pub power_db: Vec<f64>,
    pub segment_size: usize,
    pub segments_averaged: usize,
}
impl PsdResult {
    pub fn len(&self) -> usize {
        self.power_db.len()
    }
    pub fn is_empty(&self) -> bool {
        self.power_db.is_empty()
    }
    /// Spacing between neighbouring bins, if there are at least two.
    pub fn resolution_hz(&self) -> Option<f64> {
        match self.frequencies_hz.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }
    /// Frequency and power of the strongest bin; the first one wins on ties.
    pub fn max_bin(&self) -> Option<(f64, f64)> {
        let mut best: Option<usize> = None;
        for (i, p) in self.power_db.iter().enumerate() {
            if best.map_or(true, |b| *p > self.power_db[b]) {
                best = Some(i);
            }
        }
        best.map(|i| (self.frequencies_hz[i], self.power_db[i]))
    }
}
/// Welch averaged-periodogram estimator producing two-sided, power-per-bin spectra in dB.
///
/// The dB conversion is `10*log10(|fftshift(psd)| / N)` with `N` the effective segment
/// length. Bins with zero power come out as `-inf`; they are not clamped.
#[derive(Clone, Debug, Default)]
pub struct PsdEstimator {
    window: WindowKind,
    detrend: Detrend,
    overlap: Option<usize>,
}
impl PsdEstimator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }
    pub fn with_detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }
    /// Samples shared by consecutive segments; `None` means half a segment.
    /// Clamped to one less than the segment length.
    pub fn with_overlap(mut self, overlap: Option<usize>) -> Self {
        self.overlap = overlap;
        self
    }
    pub fn estimate(
        &self,
        samples: &[Complex64],
        sample_rate_hz: f64,
        center_freq_hz: f64,
        segment_size: usize,
    ) -> Result<PsdResult, AnalysisError> {
        validate_sample_rate(sample_rate_hz)?;
        if segment_size == 0 {
            return Err(AnalysisError::InvalidSegmentSize);
        }
        if samples.is_empty() {
            return Err(AnalysisError::InsufficientData);
        }
        let nperseg = segment_size.min(samples.len());
        if nperseg < segment_size {
            log::debug!(
                "segment size {segment_size} exceeds {} samples; using a single shorter segment",
                samples.len()
            );
        }
        let plan = SegmentPlan::new(self.window, self.detrend, nperseg);
        let noverlap = self.overlap.unwrap_or(nperseg / 2).min(nperseg - 1);
        let step = nperseg - noverlap;
        let mut accumulated = vec![0.0; nperseg];
        let mut segments = 0;
        let mut start = 0;
        while start + nperseg <= samples.len() {
            plan.accumulate(&samples[start..start + nperseg], &mut accumulated);
            segments += 1;
            start += step;
        }
        for p in &mut accumulated {
            *p /= segments as f64;
        }
        log::debug!("welch: {segments} segment(s) of {nperseg}, step {step}");
        Ok(PsdResult {
            frequencies_hz: frequency_axis(sample_rate_hz, center_freq_hz, nperseg),
            power_db: to_shifted_db(accumulated),
            segment_size: nperseg,
            segments_averaged: segments,
        })
    }
    pub(crate) fn plan(&self, segment_size: usize) -> SegmentPlan {
        SegmentPlan::new(self.window, self.detrend, segment_size)
    }
}
/// FFT, window and scaling for one segment length.
pub(crate) struct SegmentPlan {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    detrend: Detrend,
    scale: f64,
}
impl SegmentPlan {
    fn new(window: WindowKind, detrend: Detrend, size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(size);
        let window = window.coefficients(size);
        let sum: f64 = window.iter().sum();
        Self {
            fft,
            window,
            detrend,
            scale: 1.0 / (sum * sum),
        }
    }
    pub(crate) fn len(&self) -> usize {
        self.window.len()
    }
    /// dB spectrum of a single segment of exactly `len()` samples.
    pub(crate) fn power_db(&self, segment: &[Complex64]) -> Vec<f64> {
        let mut power = vec![0.0; self.len()];
        self.accumulate(segment, &mut power);
        to_shifted_db(power)
    }
    /// Adds the scaled periodogram of `segment` into `power`.
    fn accumulate(&self, segment: &[Complex64], power: &mut [f64]) {
        let mean = match self.detrend {
            Detrend::Constant => {
                segment.iter().sum::<Complex64>() / segment.len() as f64
            }
            Detrend::None => Complex64::new(0.0, 0.0),
        };
        let mut buffer: Vec<Complex64> = segment
            .iter()
            .zip(&self.window)
            .map(|(s, w)| (s - mean) * *w)
            .collect();
        self.fft.process(&mut buffer);
        for (p, c) in power.iter_mut().zip(&buffer) {
            *p += c.norm_sqr() * self.scale;
        }
    }
}
/// `n` points spanning `center - fs/2 ..= center + fs/2`.
pub fn frequency_axis(sample_rate_hz: f64, center_freq_hz: f64, n: usize) -> Vec<f64> {
    linspace(
        center_freq_hz - sample_rate_hz / 2.0,
        center_freq_hz + sample_rate_hz / 2.0,
        n,
    )
}
/// Evenly spaced values including both endpoints; a single point sits at `start`.
pub(crate) fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}
fn to_shifted_db(mut power: Vec<f64>) -> Vec<f64> {
    let n = power.len();
    power.rotate_right(n / 2);
    power
        .into_iter()
        .map(|p| 10.0 * (p.abs() / n as f64).log10())
        .collect()
}
