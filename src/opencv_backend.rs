use crate::error::{FaceError, PreviewError};
use crate::face::{BoundingBox, FaceEncoding, FaceModel};
use crate::preview::{FrameSink, FrameSource};
use opencv::core::{self, Mat, Rect, Size};
use opencv::prelude::*;
use opencv::{highgui, imgcodecs, imgproc, objdetect, videoio};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DETECTOR_MODEL: &str = "models/face_detection_yunet_2023mar.onnx";
pub const DEFAULT_RECOGNIZER_MODEL: &str = "models/face_recognition_sface_2021dec.onnx";

/// L2 distance threshold OpenCV recommends for normalized SFace features.
pub const SFACE_L2_TOLERANCE: f64 = 1.128;

const SFACE_INPUT_SIZE: i32 = 112;

fn path_str(path: &Path) -> Result<&str, FaceError> {
    path.to_str()
        .ok_or_else(|| FaceError::Model(format!("non UTF-8 path {}", path.display())))
}

/// YuNet face detector.
pub struct FaceDetector {
    detector: core::Ptr<objdetect::FaceDetectorYN>,
}

impl FaceDetector {
    pub fn new(model: &Path) -> Result<Self, FaceError> {
        let detector = objdetect::FaceDetectorYN::create(
            path_str(model)?,
            "",
            Size::new(320, 320),
            0.9,
            0.3,
            5000,
            0,
            0,
        )?;
        Ok(Self { detector })
    }

    /// One row per face: box, five landmarks and score.
    pub fn detect(&mut self, image: &Mat) -> Result<Mat, FaceError> {
        self.detector.set_input_size(image.size()?)?;
        let mut faces = Mat::default();
        self.detector.detect(image, &mut faces)?;
        Ok(faces)
    }
}

fn row_to_box(faces: &Mat, row: i32) -> Result<BoundingBox, FaceError> {
    let x = *faces.at_2d::<f32>(row, 0)?;
    let y = *faces.at_2d::<f32>(row, 1)?;
    let width = *faces.at_2d::<f32>(row, 2)?;
    let height = *faces.at_2d::<f32>(row, 3)?;
    Ok(BoundingBox::new(
        y.round() as i32,
        (x + width).round() as i32,
        (y + height).round() as i32,
        x.round() as i32,
    ))
}

fn clamp_to_image(face: &BoundingBox, size: Size) -> Option<Rect> {
    let left = face.left.clamp(0, size.width);
    let top = face.top.clamp(0, size.height);
    let right = face.right.clamp(0, size.width);
    let bottom = face.bottom.clamp(0, size.height);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(left, top, right - left, bottom - top))
}

fn normalize(mut values: Vec<f32>) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}

/// YuNet detection plus SFace encoding.
///
/// Detection rows from the last [`FaceModel::detect_faces`] call are kept so
/// that encoding can align on the landmarks. Boxes from elsewhere fall back
/// to a plain crop.
pub struct OpenCvFaceModel {
    detector: FaceDetector,
    recognizer: core::Ptr<objdetect::FaceRecognizerSF>,
    last_detections: Vec<(BoundingBox, Mat)>,
}

impl OpenCvFaceModel {
    pub fn new(detector_model: &Path, recognizer_model: &Path) -> Result<Self, FaceError> {
        for model in [detector_model, recognizer_model] {
            if !model.is_file() {
                return Err(FaceError::MissingModel(model.to_path_buf()));
            }
        }
        let detector = FaceDetector::new(detector_model)?;
        let recognizer =
            objdetect::FaceRecognizerSF::create(path_str(recognizer_model)?, "", 0, 0)?;
        Ok(Self {
            detector,
            recognizer,
            last_detections: Vec::new(),
        })
    }

    fn face_crop(&self, image: &Mat, face: &BoundingBox) -> Result<Mat, FaceError> {
        if let Some((_, row)) = self.last_detections.iter().find(|(known, _)| known == face) {
            let mut aligned = Mat::default();
            self.recognizer.align_crop(image, row, &mut aligned)?;
            return Ok(aligned);
        }

        let rect = clamp_to_image(face, image.size()?)
            .ok_or_else(|| FaceError::Model(format!("face {} lies outside the image", face)))?;
        let crop = Mat::roi(image, rect)?.try_clone()?;
        let mut resized = Mat::default();
        imgproc::resize(
            &crop,
            &mut resized,
            Size::new(SFACE_INPUT_SIZE, SFACE_INPUT_SIZE),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;
        Ok(resized)
    }
}

impl FaceModel for OpenCvFaceModel {
    type Image = Mat;

    fn load_image(&mut self, path: &Path) -> Result<Mat, FaceError> {
        let image = imgcodecs::imread(path_str(path)?, imgcodecs::IMREAD_COLOR)?;
        if image.empty() {
            return Err(FaceError::UnreadableImage {
                path: path.to_path_buf(),
                reason: String::from("unsupported or corrupt image"),
            });
        }
        Ok(image)
    }

    fn detect_faces(&mut self, image: &Mat) -> Result<Vec<BoundingBox>, FaceError> {
        let faces = self.detector.detect(image)?;
        self.last_detections.clear();
        for row in 0..faces.rows() {
            let face = row_to_box(&faces, row)?;
            self.last_detections.push((face, faces.row(row)?.try_clone()?));
        }
        Ok(self.last_detections.iter().map(|(face, _)| *face).collect())
    }

    fn encode_face(&mut self, image: &Mat, face: &BoundingBox) -> Result<FaceEncoding, FaceError> {
        let crop = self.face_crop(image, face)?;
        let mut feature = Mat::default();
        self.recognizer.feature(&crop, &mut feature)?;
        let values = feature.data_typed::<f32>()?.to_vec();
        Ok(FaceEncoding::new(normalize(values)))
    }

    fn match_tolerance(&self) -> f64 {
        SFACE_L2_TOLERANCE
    }
}

/// Default system camera wrapped for the preview loop. The device is
/// released when this is dropped.
pub struct CameraSource {
    index: i32,
    capture: videoio::VideoCapture,
}

impl CameraSource {
    pub fn new(index: i32) -> Result<Self, PreviewError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(|err| {
            debug!("VideoCapture failed for device {}: {:?}", index, err);
            PreviewError::DeviceUnavailable { index }
        })?;
        if !capture.is_opened()? {
            return Err(PreviewError::DeviceUnavailable { index });
        }
        Ok(Self { index, capture })
    }

    pub fn next_frame(&mut self) -> Result<Option<Mat>, PreviewError> {
        let mut frame = Mat::default();
        let grabbed = self.capture.read(&mut frame)?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl FrameSource for CameraSource {
    type Frame = Mat;

    fn read_frame(&mut self) -> Result<Option<Mat>, PreviewError> {
        self.next_frame()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(err) = self.capture.release() {
            debug!("Failed to release camera {}: {:?}", self.index, err);
        }
    }
}

/// highgui window. All highgui windows are destroyed on drop.
pub struct HighguiWindow {
    title: String,
}

impl HighguiWindow {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
        }
    }
}

impl FrameSink<Mat> for HighguiWindow {
    fn render(&mut self, frame: &Mat) -> Result<(), PreviewError> {
        highgui::imshow(&self.title, frame)?;
        Ok(())
    }

    fn poll_key(&mut self, interval: Duration) -> Result<Option<char>, PreviewError> {
        // wait_key(0) blocks forever
        let delay = interval.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(delay)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(Some(char::from((key & 0xFF) as u8)))
    }
}

impl Drop for HighguiWindow {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            debug!("Failed to destroy window {}: {:?}", self.title, err);
        }
    }
}
