// src/dsp/mod.rs
// 信号处理子模块
pub mod buffer;
pub mod codec;
pub mod error;
pub mod iq;
pub mod peaks;
pub mod pipeline;
pub mod plot;
pub mod psd;
pub mod spectrogram;
// 公开导出常用类型，方便外部调用
pub use buffer::SampleBuffer;
pub use codec::{
    decode, encode, encode_complex128, encode_complex64, SampleArray, SampleDtype,
    SerializedSamples,
};
pub use error::AnalysisError;
pub use iq::{iq_points, IqPoints};
pub use peaks::{ErrorBars, Peak, PeakDetector, DEFAULT_PROMINENCE_DB};
pub use pipeline::{AnalysisPipeline, AnalysisReport, LoadedSamples, MemorySource, SampleSource};
pub use plot::{render_iq_png, render_psd_png, render_spectrogram_png, PlotStyle};
pub use psd::{frequency_axis, Detrend, PsdEstimator, PsdResult, WindowKind};
pub use spectrogram::{AnnotationBox, Spectrogram, SpectrogramBuilder};
