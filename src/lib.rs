//! Face matching against a directory of reference images, and a webcam
//! preview loop.
//!
//! The matching policy and the preview state machine are written against the
//! [`FaceModel`], [`FaceComparator`], [`FrameSource`] and [`FrameSink`]
//! traits. Enable the `opencv` feature for the OpenCV implementations used by
//! the binaries.

pub mod error;
pub mod face;
pub mod known_faces;
pub mod logging;
pub mod matcher;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod preview;

pub use error::{FaceError, PreviewError};
pub use face::{
    BoundingBox, DetectedFace, EuclideanComparator, FaceComparator, FaceEncoding, FaceModel,
    KnownFace, MatchResult, UNKNOWN_NAME,
};
pub use known_faces::{ensure_known_faces_dir, known_face_from_encoding, load_known_faces};
pub use matcher::{best_match, match_unknown_image, recognize_faces, RecognizeConfig};
#[cfg(feature = "opencv")]
pub use opencv_backend::{CameraSource, FaceDetector, HighguiWindow, OpenCvFaceModel};
pub use preview::{
    exit_code, run_preview, CloseReason, FrameSink, FrameSource, PreviewConfig, PreviewSummary,
};
