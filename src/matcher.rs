use crate::error::FaceError;
use crate::face::{
    DetectedFace, EuclideanComparator, FaceComparator, FaceEncoding, FaceModel, KnownFace,
    MatchResult, UNKNOWN_NAME,
};
use crate::known_faces::load_known_faces;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths and threshold for one recognition run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeConfig {
    pub known_faces_dir: PathBuf,
    pub unknown_image: PathBuf,
    /// Overrides the model's own match tolerance.
    pub tolerance: Option<f64>,
}

impl Default for RecognizeConfig {
    fn default() -> Self {
        Self {
            known_faces_dir: PathBuf::from("known_faces"),
            unknown_image: PathBuf::from("unknown_image.jpg"),
            tolerance: None,
        }
    }
}

/// Index of the smallest distance. Ties go to the earliest index.
pub fn argmin(distances: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &distance) in distances.iter().enumerate() {
        match best {
            Some((_, best_distance)) if distance >= best_distance || distance.is_nan() => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

/// Closest known face to `query`, provided the comparator also accepts it.
pub fn best_match<'a, C: FaceComparator>(
    known_faces: &'a [KnownFace],
    query: &FaceEncoding,
    comparator: &C,
) -> Result<Option<&'a KnownFace>, FaceError> {
    for known in known_faces {
        if known.encoding.dimension() != query.dimension() {
            return Err(FaceError::DimensionMismatch {
                expected: known.encoding.dimension(),
                actual: query.dimension(),
            });
        }
    }

    let distances: Vec<f64> = known_faces
        .iter()
        .map(|known| comparator.distance(&known.encoding, query))
        .collect();

    Ok(argmin(&distances)
        .map(|index| &known_faces[index])
        .filter(|candidate| comparator.is_match(&candidate.encoding, query)))
}

/// Label each detected face, keeping detection order.
pub fn match_faces<C: FaceComparator>(
    known_faces: &[KnownFace],
    detected: &[DetectedFace],
    comparator: &C,
) -> Result<Vec<MatchResult>, FaceError> {
    detected
        .iter()
        .map(|face| {
            let name = best_match(known_faces, &face.encoding, comparator)?
                .map(|known| known.name.clone())
                .unwrap_or_else(|| UNKNOWN_NAME.to_owned());
            info!("  Face at {} is: {}", face.bounding_box, name);
            Ok(MatchResult {
                bounding_box: face.bounding_box,
                name,
            })
        })
        .collect()
}

/// Detect and encode every face in the image at `path`.
pub fn detect_and_encode<M: FaceModel>(
    model: &mut M,
    path: &Path,
) -> Result<Vec<DetectedFace>, FaceError> {
    if !path.exists() {
        return Err(FaceError::MissingFile(path.to_path_buf()));
    }
    let image = model
        .load_image(path)
        .map_err(|err| match err {
            FaceError::UnreadableImage { .. } => err,
            other => FaceError::UnreadableImage {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

    let locations = model.detect_faces(&image)?;
    info!("Found {} face(s) in the unknown image.", locations.len());

    locations
        .into_iter()
        .map(|bounding_box| {
            let encoding = model.encode_face(&image, &bounding_box)?;
            Ok(DetectedFace {
                bounding_box,
                encoding,
            })
        })
        .collect()
}

pub fn match_unknown_image<M: FaceModel, C: FaceComparator>(
    model: &mut M,
    path: &Path,
    known_faces: &[KnownFace],
    comparator: &C,
) -> Result<Vec<MatchResult>, FaceError> {
    if known_faces.is_empty() {
        return Err(FaceError::NoKnownFaces);
    }
    info!("Processing unknown image: {}", path.display());
    let detected = detect_and_encode(model, path)?;
    match_faces(known_faces, &detected, comparator)
}

/// Load the reference faces and match the unknown image against them.
///
/// Aborts with [`FaceError::NoKnownFaces`] before the unknown image is
/// touched when no reference face could be loaded.
pub fn recognize_faces<M: FaceModel>(
    model: &mut M,
    config: &RecognizeConfig,
) -> Result<Vec<MatchResult>, FaceError> {
    let known_faces = load_known_faces(model, &config.known_faces_dir)?;
    if known_faces.is_empty() {
        return Err(FaceError::NoKnownFaces);
    }

    let comparator =
        EuclideanComparator::new(config.tolerance.unwrap_or_else(|| model.match_tolerance()));
    match_unknown_image(model, &config.unknown_image, &known_faces, &comparator)
}
