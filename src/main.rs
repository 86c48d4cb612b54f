// src/main.rs
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rustfft::num_complex::Complex32;
use serde::Serialize;
use sigview::config::{AnalysisConfig, FFT_SIZE_OPTIONS};
use sigview::dsp::{
    decode, encode, render_iq_png, render_psd_png, render_spectrogram_png, AnalysisPipeline,
    AnnotationBox, ErrorBars, Peak, PlotStyle, SampleArray, SampleDtype, SerializedSamples,
    Spectrogram, WindowKind,
};
use sigview::sigmf::{SigMfCapture, SigMfGlobal, SigMfMeta, SigMfRecording};
#[derive(Parser)]
#[command(name = "sigview")]
#[command(version, about = "Spectral analysis of SigMF recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}
#[derive(Subcommand)]
enum Commands {
    /// Print recording metadata
    Info {
        /// Recording (.sigmf-meta, .sigmf-data or base path)
        recording: PathBuf,
    },
    /// Welch power spectral density of the recording (or a slice of it)
    Psd(AnalysisArgs),
    /// Block-wise power spectra with annotation boxes
    Spectrogram(AnalysisArgs),
    /// Detect peaks in the power spectral density
    Peaks(AnalysisArgs),
    /// Decimated, normalised constellation points
    Iq(AnalysisArgs),
    /// Every view in one JSON document
    Report(AnalysisArgs),
    /// Encode recording samples as a {dtype, buffer} payload
    Encode {
        recording: PathBuf,
        /// complex64 or complex128
        #[arg(long, default_value = "complex128")]
        dtype: SampleDtype,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode a {dtype, buffer} payload, optionally into a new SigMF recording
    Decode {
        /// JSON payload file
        input: PathBuf,
        /// Base path of the recording to write
        #[arg(short, long, requires = "sample_rate")]
        output: Option<PathBuf>,
        /// Sample rate in Hz for the written metadata
        #[arg(long)]
        sample_rate: Option<f64>,
        /// Capture center frequency in Hz for the written metadata
        #[arg(long)]
        center_freq: Option<f64>,
    },
}
#[derive(Args)]
struct AnalysisArgs {
    /// Recording (.sigmf-meta, .sigmf-data or base path)
    recording: PathBuf,
    /// JSON analysis config; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Sample rate override in Hz
    #[arg(long)]
    sample_rate: Option<f64>,
    /// Center frequency override in Hz
    #[arg(long)]
    center_freq: Option<f64>,
    /// Label frequencies relative to 0 Hz instead of the capture frequency
    #[arg(long)]
    baseband: bool,
    /// Spectrogram block size (32..=16384, power of two)
    #[arg(long)]
    block_size: Option<usize>,
    /// Welch segment size for the PSD
    #[arg(long)]
    segment_size: Option<usize>,
    /// Samples shared by consecutive PSD segments (default: half a segment)
    #[arg(long)]
    overlap: Option<usize>,
    /// Minimum peak prominence in dB
    #[arg(long)]
    prominence: Option<f64>,
    /// Minimum peak bandwidth in Hz
    #[arg(long)]
    min_bandwidth: Option<f64>,
    /// Skip peak detection in the PSD and report views
    #[arg(long)]
    no_analyze: bool,
    /// Sample range used for the PSD and IQ views
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    slice: Option<Vec<usize>>,
    /// Keep every n-th sample in the IQ view
    #[arg(long)]
    decimate: Option<usize>,
    /// Truncate recordings longer than this
    #[arg(long)]
    max_samples: Option<usize>,
    /// hann, hamming, blackman or rectangular
    #[arg(long, value_parser = parse_window)]
    window: Option<WindowKind>,
    /// JSON output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also render the view to a PNG file
    #[arg(long)]
    png: Option<PathBuf>,
}
impl AnalysisArgs {
    fn config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if self.sample_rate.is_some() {
            config.sample_rate_hz = self.sample_rate;
        }
        if self.center_freq.is_some() {
            config.center_frequency_hz = self.center_freq;
        }
        if self.baseband {
            config.rf_frequencies = false;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(segment_size) = self.segment_size {
            config.psd_segment_size = segment_size;
        }
        if self.overlap.is_some() {
            config.psd_overlap = self.overlap;
        }
        if self.prominence.is_some() {
            config.prominence = self.prominence;
        }
        if self.min_bandwidth.is_some() {
            config.min_bandwidth_hz = self.min_bandwidth;
        }
        if self.no_analyze {
            config.analyze = false;
        }
        if let Some([start, end]) = self.slice.as_deref() {
            config.slice = Some((*start, *end));
        }
        if let Some(decimate) = self.decimate {
            config.iq_decimation = decimate;
        }
        if self.max_samples.is_some() {
            config.max_samples = self.max_samples;
        }
        if let Some(window) = self.window {
            config.window = window;
        }
        if !FFT_SIZE_OPTIONS.contains(&config.block_size) {
            bail!(
                "block size {} is not one of {:?}",
                config.block_size,
                FFT_SIZE_OPTIONS
            );
        }
        Ok(config)
    }
    fn pipeline(&self) -> Result<AnalysisPipeline<SigMfRecording>> {
        let config = self.config()?;
        let recording = SigMfRecording::open(&self.recording)
            .with_context(|| format!("failed to open {}", self.recording.display()))?;
        Ok(AnalysisPipeline::new(recording, config))
    }
    fn style(&self, title: &str) -> PlotStyle {
        PlotStyle {
            title: format!("{title}: {}", self.recording.display()),
            ..PlotStyle::default()
        }
    }
}
fn parse_window(name: &str) -> Result<WindowKind, String> {
    serde_json::from_value(serde_json::Value::String(name.to_lowercase()))
        .map_err(|_| format!("unknown window {name:?}"))
}
#[derive(Serialize)]
struct RecordingInfo<'a> {
    data_path: String,
    sample_count: usize,
    duration_s: f64,
    meta: &'a SigMfMeta,
}
#[derive(Serialize)]
struct SpectrogramView {
    spectrogram: Spectrogram,
    annotation_boxes: Vec<AnnotationBox>,
}
#[derive(Serialize)]
struct PeaksView {
    peaks: Vec<Peak>,
    error_bars: Vec<ErrorBars>,
}
#[derive(Serialize)]
struct DecodedSummary {
    dtype: String,
    sample_count: usize,
}
fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => writeln!(std::io::stdout().lock(), "{json}")?,
    }
    Ok(())
}
fn write_png(path: Option<&Path>, render: impl FnOnce() -> Result<Vec<u8>>) -> Result<()> {
    if let Some(path) = path {
        let bytes = render()?;
        fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}
fn write_recording(
    base: &Path,
    samples: &SampleArray,
    sample_rate: f64,
    center_freq: Option<f64>,
) -> Result<()> {
    let meta = SigMfMeta {
        global: SigMfGlobal {
            datatype: samples.sigmf_datatype().to_string(),
            sample_rate,
            version: "1.0.0".to_string(),
            num_channels: Some(1),
            offset: None,
            description: None,
            author: None,
            hw: None,
            extensions: HashMap::new(),
        },
        captures: vec![SigMfCapture {
            sample_start: 0,
            frequency: center_freq,
            datetime: None,
            extensions: HashMap::new(),
        }],
        annotations: Vec::new(),
    };
    SigMfRecording::write(base, &meta, &samples.to_le_bytes())
        .with_context(|| format!("failed to write recording {}", base.display()))?;
    log::info!("wrote {} samples", samples.len());
    Ok(())
}
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Info { recording } => {
            let recording = SigMfRecording::open(&recording)
                .with_context(|| format!("failed to open {}", recording.display()))?;
            let buffer = recording.to_buffer(true)?;
            emit(
                &RecordingInfo {
                    data_path: recording.data_path.display().to_string(),
                    sample_count: buffer.len(),
                    duration_s: buffer.duration_s(),
                    meta: &recording.meta,
                },
                None,
            )?;
        }
        Commands::Psd(args) => {
            let mut pipeline = args.pipeline()?;
            let psd = pipeline.psd()?;
            let peaks = if pipeline.config().analyze {
                pipeline.peaks(&psd)
            } else {
                Vec::new()
            };
            write_png(args.png.as_deref(), || {
                Ok(render_psd_png(&psd, &peaks, args.style("PSD"))?)
            })?;
            emit(&psd, args.output.as_deref())?;
        }
        Commands::Spectrogram(args) => {
            let mut pipeline = args.pipeline()?;
            let spectrogram = pipeline.spectrogram()?;
            let annotation_boxes: Vec<AnnotationBox> = pipeline
                .samples()?
                .annotations
                .iter()
                .map(|a| spectrogram.annotation_box(a))
                .collect();
            write_png(args.png.as_deref(), || {
                Ok(render_spectrogram_png(
                    &spectrogram,
                    &annotation_boxes,
                    args.style("Spectrogram"),
                )?)
            })?;
            emit(
                &SpectrogramView {
                    spectrogram,
                    annotation_boxes,
                },
                args.output.as_deref(),
            )?;
        }
        Commands::Peaks(args) => {
            let mut pipeline = args.pipeline()?;
            let psd = pipeline.psd()?;
            let peaks = pipeline.peaks(&psd);
            write_png(args.png.as_deref(), || {
                Ok(render_psd_png(&psd, &peaks, args.style("Peaks"))?)
            })?;
            emit(
                &PeaksView {
                    error_bars: peaks.iter().map(Peak::error_bars).collect(),
                    peaks,
                },
                args.output.as_deref(),
            )?;
        }
        Commands::Iq(args) => {
            let mut pipeline = args.pipeline()?;
            let iq = pipeline.iq()?;
            write_png(args.png.as_deref(), || {
                Ok(render_iq_png(&iq, args.style("IQ"))?)
            })?;
            emit(&iq, args.output.as_deref())?;
        }
        Commands::Report(args) => {
            let report = args.pipeline()?.run()?;
            write_png(args.png.as_deref(), || {
                Ok(render_psd_png(&report.psd, &report.peaks, args.style("PSD"))?)
            })?;
            emit(&report, args.output.as_deref())?;
        }
        Commands::Encode {
            recording,
            dtype,
            output,
        } => {
            let recording = SigMfRecording::open(&recording)
                .with_context(|| format!("failed to open {}", recording.display()))?;
            let samples = match dtype {
                SampleDtype::Complex64 => SampleArray::Complex64(
                    recording
                        .samples()
                        .iter()
                        .map(|c| Complex32::new(c.re as f32, c.im as f32))
                        .collect(),
                ),
                SampleDtype::Complex128 => SampleArray::Complex128(recording.samples().to_vec()),
            };
            emit(&encode(&samples), output.as_deref())?;
        }
        Commands::Decode {
            input,
            output,
            sample_rate,
            center_freq,
        } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let store: SerializedSamples = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a sample payload", input.display()))?;
            let samples = decode(&store)?;
            if let (Some(base), Some(rate)) = (output, sample_rate) {
                write_recording(&base, &samples, rate, center_freq)?;
            }
            emit(
                &DecodedSummary {
                    dtype: samples.dtype().to_string(),
                    sample_count: samples.len(),
                },
                None,
            )?;
        }
    }
    Ok(())
}
