use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No faces detected")]
    NoFacesDetected,

    #[error("Failed to load model: {0}")]
    ModelLoadFailed(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Not enough signal in the image to produce a result")]
    InsufficientSignal,

    #[error("Buffer allocation failed: {0}")]
    BufferAllocationFailed(String),

    #[error("Invalid model output format: {0}")]
    InvalidOutputFormat(String),

    #[error("Image processing backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
