use crate::error::FaceError;
use crate::face::{FaceEncoding, FaceModel, KnownFace};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Case insensitive check on the file name suffix.
pub fn is_candidate_image(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Identity name for a reference image: the file name without its extension.
pub fn face_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_owned())
}

/// Turn the first encoding found in a reference image into a known face.
/// `None` means the image had no face and is skipped.
pub fn known_face_from_encoding(
    file_name: &str,
    encoding: Option<FaceEncoding>,
) -> Option<KnownFace> {
    encoding.map(|encoding| KnownFace {
        name: face_name(file_name),
        encoding,
    })
}

/// Create the reference directory if it is missing. Returns `true` when it was created.
pub fn ensure_known_faces_dir(path: &Path) -> Result<bool, FaceError> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)?;
    Ok(true)
}

/// Candidate image files in `dir`, sorted by file name.
pub fn candidate_images(dir: &Path) -> Result<Vec<PathBuf>, FaceError> {
    if !dir.is_dir() {
        return Err(FaceError::MissingDirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .file_name()
            .map(|name| is_candidate_image(&name.to_string_lossy()))
            .unwrap_or(false);
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn first_encoding<M: FaceModel>(
    model: &mut M,
    path: &Path,
) -> Result<Option<FaceEncoding>, FaceError> {
    let image = model.load_image(path)?;
    let faces = model.detect_faces(&image)?;
    let Some(first) = faces.first() else {
        return Ok(None);
    };
    if faces.len() > 1 {
        debug!(
            "{} faces in {}, using the first one",
            faces.len(),
            path.display()
        );
    }
    model.encode_face(&image, first).map(Some)
}

/// Load every reference face in `dir`.
///
/// Files that can't be read, contain no face, or encode to a different
/// dimension than the first loaded face are logged and skipped, so the
/// result may be empty. Only a missing directory is an error.
pub fn load_known_faces<M: FaceModel>(
    model: &mut M,
    dir: &Path,
) -> Result<Vec<KnownFace>, FaceError> {
    info!("Loading known faces from: {}", dir.display());

    let mut known_faces: Vec<KnownFace> = Vec::new();
    for path in candidate_images(dir)? {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match first_encoding(model, &path) {
            Ok(encoding) => match known_face_from_encoding(&file_name, encoding) {
                Some(known_face) => {
                    let expected = known_faces.first().map(|first| first.encoding.dimension());
                    let actual = known_face.encoding.dimension();
                    match expected {
                        Some(expected) if expected != actual => {
                            let err = FaceError::DimensionMismatch { expected, actual };
                            error!("  Error loading {}: {}", file_name, err);
                        }
                        _ => {
                            info!("  Loaded: {}", known_face.name);
                            known_faces.push(known_face);
                        }
                    }
                }
                None => info!("  No face found in {}. Skipping.", file_name),
            },
            Err(err) => error!("  Error loading {}: {}", file_name, err),
        }
    }

    Ok(known_faces)
}
