use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("Directory not found at {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Image file not found at {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Model file not found at {}", .0.display())]
    MissingModel(PathBuf),

    #[error("Failed to load image {}: {reason}", .path.display())]
    UnreadableImage { path: PathBuf, reason: String },

    #[error("No known faces loaded. Please ensure the known faces directory contains images with faces.")]
    NoKnownFaces,

    #[error("Encoding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Face model error: {0}")]
    Model(String),

    #[error("IO error {0:?}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error {0:?}")]
    OpenCv(#[from] opencv::Error),
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Could not open capture device {index}")]
    DeviceUnavailable { index: i32 },

    #[error("Failed to display frame: {0}")]
    Display(String),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error {0:?}")]
    OpenCv(#[from] opencv::Error),
}
