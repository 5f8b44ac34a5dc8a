use clap::Parser;
use face_match::opencv_backend::{DEFAULT_DETECTOR_MODEL, DEFAULT_RECOGNIZER_MODEL};
use face_match::{
    ensure_known_faces_dir, logging, recognize_faces, FaceError, OpenCvFaceModel, RecognizeConfig,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Directory of reference images, one person per file named after them.
    #[clap(long, default_value = "known_faces")]
    known_faces: PathBuf,

    /// Image containing the faces to identify.
    #[clap(long, default_value = "unknown_image.jpg")]
    unknown_image: PathBuf,

    /// YuNet face detection model.
    #[clap(long, default_value = DEFAULT_DETECTOR_MODEL)]
    detector_model: PathBuf,

    /// SFace face recognition model.
    #[clap(long, default_value = DEFAULT_RECOGNIZER_MODEL)]
    recognizer_model: PathBuf,

    /// Maximum encoding distance for a match. Defaults to the model's threshold.
    #[clap(long)]
    tolerance: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = Args::parse();
    logging::init()?;

    let config = RecognizeConfig {
        known_faces_dir: args.known_faces,
        unknown_image: args.unknown_image,
        tolerance: args.tolerance,
    };

    if ensure_known_faces_dir(&config.known_faces_dir)? {
        info!("Created directory: {}", config.known_faces_dir.display());
        info!("Please add known face images (e.g., 'john.jpg') to this directory.");
    }

    if !config.unknown_image.exists() {
        warn!(
            "'{}' not found. Please create or provide a path to your unknown image.",
            config.unknown_image.display()
        );
        return Ok(());
    }

    let mut model = OpenCvFaceModel::new(&args.detector_model, &args.recognizer_model)?;

    match recognize_faces(&mut model, &config) {
        Ok(_) => {}
        Err(FaceError::NoKnownFaces) => info!("{}", FaceError::NoKnownFaces),
        Err(FaceError::MissingFile(path)) => {
            error!("Error: Unknown image file not found at {}", path.display())
        }
        Err(err) => error!("Error: {}", err),
    }

    Ok(())
}
