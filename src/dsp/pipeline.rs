use serde::Serialize;
use crate::config::AnalysisConfig;
use crate::dsp::codec::{encode_complex128, SerializedSamples};
use crate::dsp::iq::{iq_points, IqPoints};
use crate::dsp::peaks::{ErrorBars, Peak, PeakDetector};
use crate::dsp::psd::{PsdEstimator, PsdResult};
use crate::dsp::spectrogram::{AnnotationBox, Spectrogram, SpectrogramBuilder};
use crate::dsp::{AnalysisError, SampleBuffer};
use crate::sigmf::{SigMfAnnotation, SigMfRecording};
/// Samples plus the annotations that came with them.
#[derive(Clone, Debug)]
pub struct LoadedSamples {
    pub buffer: SampleBuffer,
    pub annotations: Vec<SigMfAnnotation>,
}
/// Anything that can hand the pipeline a sample buffer.
pub trait SampleSource {
    fn load(&mut self, config: &AnalysisConfig) -> Result<LoadedSamples, AnalysisError>;
}
impl SampleSource for SigMfRecording {
    fn load(&mut self, config: &AnalysisConfig) -> Result<LoadedSamples, AnalysisError> {
        let params = config.resolve(&self.meta);
        let buffer = SampleBuffer::new(self.samples().to_vec(), params.sample_rate_hz)?
            .with_center_frequency(params.center_frequency_hz);
        Ok(LoadedSamples {
            buffer,
            annotations: self.meta.annotations.clone(),
        })
    }
}
/// In-memory source for tests and already-decoded payloads.
pub struct MemorySource {
    loaded: LoadedSamples,
}
impl MemorySource {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            loaded: LoadedSamples {
                buffer,
                annotations: Vec::new(),
            },
        }
    }
    pub fn with_annotations(mut self, annotations: Vec<SigMfAnnotation>) -> Self {
        self.loaded.annotations = annotations;
        self
    }
}
impl SampleSource for MemorySource {
    fn load(&mut self, _config: &AnalysisConfig) -> Result<LoadedSamples, AnalysisError> {
        Ok(self.loaded.clone())
    }
}
/// Everything the viewer draws for one recording.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub sample_count: usize,
    pub sample_rate_hz: f64,
    pub center_frequency_hz: Option<f64>,
    pub truncated: bool,
    pub spectrogram: Spectrogram,
    pub annotation_boxes: Vec<AnnotationBox>,
    pub psd: PsdResult,
    pub peaks: Vec<Peak>,
    pub error_bars: Vec<ErrorBars>,
    pub iq: IqPoints,
}
/// Loads samples once and derives the spectrogram, PSD, peak and IQ views from them.
pub struct AnalysisPipeline<S: SampleSource> {
    source: S,
    config: AnalysisConfig,
    loaded: Option<LoadedSamples>,
    truncated: bool,
}
impl<S: SampleSource> AnalysisPipeline<S> {
    pub fn new(source: S, config: AnalysisConfig) -> Self {
        Self {
            source,
            config,
            loaded: None,
            truncated: false,
        }
    }
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
    /// Loaded samples, reading from the source on first use.
    pub fn samples(&mut self) -> Result<&LoadedSamples, AnalysisError> {
        if self.loaded.is_none() {
            let mut loaded = self.source.load(&self.config)?;
            if let Some(limit) = self.config.max_samples {
                self.truncated = loaded.buffer.truncate(limit);
            }
            self.loaded = Some(loaded);
        }
        self.loaded
            .as_ref()
            .ok_or(AnalysisError::InsufficientData)
    }
    fn estimator(&self) -> PsdEstimator {
        PsdEstimator::new()
            .with_window(self.config.window)
            .with_detrend(self.config.detrend)
            .with_overlap(self.config.psd_overlap)
    }
    pub fn spectrogram(&mut self) -> Result<Spectrogram, AnalysisError> {
        let builder = SpectrogramBuilder::new(self.estimator());
        let block_size = self.config.block_size;
        let buffer = &self.samples()?.buffer;
        builder.build(
            buffer.samples(),
            buffer.sample_rate_hz(),
            block_size,
            buffer.frequency_offset_hz(),
        )
    }
    /// PSD of the configured slice (or the whole buffer).
    pub fn psd(&mut self) -> Result<PsdResult, AnalysisError> {
        let estimator = self.estimator();
        let segment_size = self.config.psd_segment_size;
        let slice = self.config.slice;
        let buffer = &self.samples()?.buffer;
        let samples = match slice {
            Some((start, end)) => buffer.slice(start, end),
            None => buffer.samples(),
        };
        estimator.estimate(
            samples,
            buffer.sample_rate_hz(),
            buffer.frequency_offset_hz(),
            segment_size,
        )
    }
    pub fn peaks(&self, psd: &PsdResult) -> Vec<Peak> {
        PeakDetector::new()
            .with_prominence(self.config.prominence)
            .with_min_bandwidth(self.config.min_bandwidth_hz)
            .find(&psd.frequencies_hz, &psd.power_db)
    }
    pub fn iq(&mut self) -> Result<IqPoints, AnalysisError> {
        let decimate = self.config.iq_decimation;
        let slice = self.config.slice;
        let buffer = &self.samples()?.buffer;
        let samples = match slice {
            Some((start, end)) => buffer.slice(start, end),
            None => buffer.samples(),
        };
        Ok(iq_points(samples, decimate))
    }
    /// Transport form of the loaded samples.
    pub fn store(&mut self) -> Result<SerializedSamples, AnalysisError> {
        Ok(encode_complex128(self.samples()?.buffer.samples()))
    }
    pub fn run(&mut self) -> Result<AnalysisReport, AnalysisError> {
        let spectrogram = self.spectrogram()?;
        let psd = self.psd()?;
        let peaks = if self.config.analyze {
            self.peaks(&psd)
        } else {
            Vec::new()
        };
        let iq = self.iq()?;
        let truncated = self.truncated;
        let loaded = self.samples()?;
        let annotation_boxes = loaded
            .annotations
            .iter()
            .map(|a| spectrogram.annotation_box(a))
            .collect();
        Ok(AnalysisReport {
            sample_count: loaded.buffer.len(),
            sample_rate_hz: loaded.buffer.sample_rate_hz(),
            center_frequency_hz: loaded.buffer.center_frequency_hz(),
            truncated,
            error_bars: peaks.iter().map(Peak::error_bars).collect(),
            spectrogram,
            annotation_boxes,
            psd,
            peaks,
            iq,
        })
    }
}
