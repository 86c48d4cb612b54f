use thiserror::Error;
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to decode samples: {0}")]
    Decode(String),
    #[error("cannot estimate a spectrum from an empty sample sequence")]
    InsufficientData,
    #[error("invalid block size {0}: must be greater than zero")]
    InvalidBlockSize(usize),
    #[error("segment size must be greater than zero")]
    InvalidSegmentSize,
    #[error("sample rate must be positive and finite")]
    InvalidSampleRate,
    #[error("invalid SigMF metadata: {0}")]
    Metadata(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AnalysisError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AnalysisError {
    fn from(value: image::ImageError) -> Self {
        AnalysisError::Plot(value.to_string())
    }
}
