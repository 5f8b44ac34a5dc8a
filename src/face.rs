use crate::error::FaceError;
use std::fmt;
use std::path::Path;

/// Name assigned to a detected face that matches none of the known faces.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Tolerance used by [`EuclideanComparator::default`].
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Pixel rectangle locating a face, in (top, right, bottom, left) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl BoundingBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Feature vector summarizing a face. Its length is fixed by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEncoding(Vec<f32>);

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for FaceEncoding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownFace {
    pub name: String,
    pub encoding: FaceEncoding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    pub encoding: FaceEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub bounding_box: BoundingBox,
    pub name: String,
}

impl MatchResult {
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_NAME
    }
}

/// External face detection and encoding model.
///
/// The matching policy only ever sees boxes and encodings, so it can be
/// exercised with any implementation of this trait.
pub trait FaceModel {
    type Image;

    /// Decode the image at `path`. Fails for unreadable or unsupported files.
    fn load_image(&mut self, path: &Path) -> Result<Self::Image, FaceError>;

    /// Locate every face in the image, in the model's detection order.
    fn detect_faces(&mut self, image: &Self::Image) -> Result<Vec<BoundingBox>, FaceError>;

    fn encode_face(
        &mut self,
        image: &Self::Image,
        face: &BoundingBox,
    ) -> Result<FaceEncoding, FaceError>;

    /// Largest distance at which two encodings from this model are the same person.
    fn match_tolerance(&self) -> f64 {
        DEFAULT_TOLERANCE
    }
}

/// Distance and match decision between two encodings. Lower distance means
/// more similar.
pub trait FaceComparator {
    fn distance(&self, known: &FaceEncoding, candidate: &FaceEncoding) -> f64;

    fn is_match(&self, known: &FaceEncoding, candidate: &FaceEncoding) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanComparator {
    pub tolerance: f64,
}

impl EuclideanComparator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for EuclideanComparator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl FaceComparator for EuclideanComparator {
    fn distance(&self, known: &FaceEncoding, candidate: &FaceEncoding) -> f64 {
        known
            .as_slice()
            .iter()
            .zip(candidate.as_slice())
            .map(|(a, b)| {
                let diff = f64::from(*a) - f64::from(*b);
                diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }

    fn is_match(&self, known: &FaceEncoding, candidate: &FaceEncoding) -> bool {
        // NaN never matches
        self.distance(known, candidate) <= self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_distance() {
        let comparator = EuclideanComparator::default();
        let a = FaceEncoding::new(vec![0.0, 0.0]);
        let b = FaceEncoding::new(vec![3.0, 4.0]);
        assert!((comparator.distance(&a, &b) - 5.0).abs() < 1e-9);
        assert_eq!(comparator.distance(&a, &a), 0.0);
    }

    #[test]
    fn match_is_inclusive_of_tolerance() {
        let comparator = EuclideanComparator::new(0.5);
        let known = FaceEncoding::new(vec![0.0]);
        assert!(comparator.is_match(&known, &FaceEncoding::new(vec![0.5])));
        assert!(!comparator.is_match(&known, &FaceEncoding::new(vec![0.51])));
    }

    #[test]
    fn nan_never_matches() {
        let comparator = EuclideanComparator::default();
        let known = FaceEncoding::new(vec![0.0]);
        assert!(!comparator.is_match(&known, &FaceEncoding::new(vec![f32::NAN])));
    }

    #[test]
    fn bounding_box_display_uses_top_right_bottom_left() {
        let face = BoundingBox::new(10, 80, 90, 20);
        assert_eq!(face.to_string(), "(10, 80, 90, 20)");
        assert_eq!(face.width(), 60);
        assert_eq!(face.height(), 80);
    }
}
