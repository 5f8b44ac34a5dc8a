use face_match::{BoundingBox, FaceEncoding, FaceError, FaceModel};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Test model whose "images" are text files, one face per line:
/// `top right bottom left: v1 v2 ...`. A file containing `corrupt` fails to load.
#[derive(Default)]
pub struct ScriptedModel {
    pub loaded: Vec<PathBuf>,
    pub tolerance: Option<f64>,
}

pub type ScriptedImage = Vec<(BoundingBox, FaceEncoding)>;

fn parse_line(line: &str) -> Option<(BoundingBox, FaceEncoding)> {
    let (bounds, values) = line.split_once(':')?;
    let bounds: Vec<i32> = bounds
        .split_whitespace()
        .map(|v| v.parse().ok())
        .collect::<Option<_>>()?;
    let values: Vec<f32> = values
        .split_whitespace()
        .map(|v| v.parse().ok())
        .collect::<Option<_>>()?;
    match bounds[..] {
        [top, right, bottom, left] => Some((
            BoundingBox::new(top, right, bottom, left),
            FaceEncoding::new(values),
        )),
        _ => None,
    }
}

impl FaceModel for ScriptedModel {
    type Image = ScriptedImage;

    fn load_image(&mut self, path: &Path) -> Result<ScriptedImage, FaceError> {
        self.loaded.push(path.to_path_buf());
        let contents = fs::read_to_string(path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                parse_line(line).ok_or_else(|| FaceError::UnreadableImage {
                    path: path.to_path_buf(),
                    reason: format!("bad line {line:?}"),
                })
            })
            .collect()
    }

    fn detect_faces(&mut self, image: &ScriptedImage) -> Result<Vec<BoundingBox>, FaceError> {
        Ok(image.iter().map(|(face, _)| *face).collect())
    }

    fn encode_face(
        &mut self,
        image: &ScriptedImage,
        face: &BoundingBox,
    ) -> Result<FaceEncoding, FaceError> {
        image
            .iter()
            .find(|(known, _)| known == face)
            .map(|(_, encoding)| encoding.clone())
            .ok_or_else(|| FaceError::Model(format!("no face at {face}")))
    }

    fn match_tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(face_match::face::DEFAULT_TOLERANCE)
    }
}

pub fn write_image(dir: &Path, name: &str, faces: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, faces.join("\n")).unwrap();
    path
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a plain-text subscriber and return its result with the log lines.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_level(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let lines = output.lines().map(|line| line.trim().to_owned()).collect();
    (result, lines)
}
