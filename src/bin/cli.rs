//! CLI for applying portrait filters with precomputed detection data.
//!
//! Usage:
//!   portrait-fx filters                                        # List filters
//!   portrait-fx apply photo.jpg -f head_size -i 0.5 --faces faces.json -o out.png
//!   portrait-fx apply photo.jpg -f hair_color_red -i 0.8 --labels labels.png -o out.png
//!   portrait-fx overlay photo.jpg --faces faces.json --labels labels.png -o debug.png
//!
//! Faces are a JSON `FaceTrackingResult` (or a bare list of faces) in the
//! detector's lower-left normalized convention. Labels are an 8-bit grayscale
//! image whose pixel values are face-parsing class indices.

use clap::{Parser, Subcommand};
use image::{GrayImage, RgbImage};
use ndarray::{Array, ArrayD, IxDyn};
use portrait_fx::{
    render_hair_mask, render_landmarks, segment_with, ApplyOutcome, CpuBackend, DetectionOrchestrator,
    EditSession, Error, FaceLandmarkDetector, FaceRecord, FaceTrackingResult, FilterCategory,
    FilterConfiguration, FilterEngine, FilterType, Photo, SegmentationModel, SegmentationWorker,
    Size, WorkerConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "portrait-fx")]
#[command(author, version, about = "Detection-driven portrait filters", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply one filter to an image
    Apply {
        /// Input image file
        image: PathBuf,

        /// Filter key, e.g. head_size or hair_color_blonde
        #[arg(short, long)]
        filter: FilterType,

        /// Filter intensity in [-1, 1]
        #[arg(short, long, default_value = "0.5", allow_hyphen_values = true)]
        intensity: f32,

        /// Face detection JSON
        #[arg(long)]
        faces: Option<PathBuf>,

        /// Hair segmentation class-label image
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List available filters
    Filters {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Draw detection results over an image
    Overlay {
        /// Input image file
        image: PathBuf,

        /// Face detection JSON
        #[arg(long)]
        faces: Option<PathBuf>,

        /// Hair segmentation class-label image
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FacesFile {
    Result(FaceTrackingResult),
    Faces(Vec<FaceRecord>),
}

fn load_faces(path: &Path, image_size: Size) -> Result<FaceTrackingResult, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let result = match serde_json::from_str::<FacesFile>(&text)? {
        FacesFile::Result(mut result) => {
            if result.image_size.is_empty() {
                result.image_size = image_size;
            }
            result
        }
        FacesFile::Faces(faces) => FaceTrackingResult::new(faces, image_size),
    };
    Ok(result)
}

/// Face detector that replays a detection loaded from disk.
struct PrecomputedFaces {
    result: Option<FaceTrackingResult>,
}

impl FaceLandmarkDetector for PrecomputedFaces {
    async fn detect_faces(&self, _image: Arc<image::RgbaImage>) -> portrait_fx::Result<FaceTrackingResult> {
        self.result.clone().ok_or(Error::NoFacesDetected)
    }
}

/// Segmentation "model" backed by a class-label image.
struct LabelMapModel {
    labels: GrayImage,
}

impl LabelMapModel {
    fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let labels = image::open(path)?.to_luma8();
        Ok(Self { labels })
    }
}

impl SegmentationModel for LabelMapModel {
    fn input_size(&self) -> (u32, u32) {
        self.labels.dimensions()
    }

    fn predict(&mut self, _input: &RgbImage) -> portrait_fx::Result<ArrayD<i32>> {
        let (width, height) = self.labels.dimensions();
        let values = self.labels.pixels().map(|p| p[0] as i32).collect();
        Array::from_shape_vec(IxDyn(&[height as usize, width as usize]), values)
            .map_err(|e| Error::InvalidOutputFormat(e.to_string()))
    }
}

#[derive(Serialize)]
struct FilterListing {
    key: String,
    name: String,
    group: String,
    category: String,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Command::Apply {
            image,
            filter,
            intensity,
            faces,
            labels,
            output,
        } => {
            apply(
                args.verbose,
                image,
                FilterConfiguration::new(*filter, *intensity),
                faces.as_deref(),
                labels.as_deref(),
                output,
            )
            .await
        }
        Command::Filters { json } => list_filters(*json),
        Command::Overlay {
            image,
            faces,
            labels,
            output,
        } => overlay(args.verbose, image, faces.as_deref(), labels.as_deref(), output),
    }
}

async fn apply(
    verbose: bool,
    image_path: &Path,
    configuration: FilterConfiguration,
    faces: Option<&Path>,
    labels: Option<&Path>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        eprintln!("Loading image {:?}...", image_path);
    }
    let image = image::open(image_path)?.to_rgba8();
    let size = Size::from_dimensions(image.dimensions());

    let faces = faces.map(|path| load_faces(path, size)).transpose()?;
    if verbose {
        if let Some(faces) = &faces {
            eprintln!("Loaded {} face(s)", faces.faces.len());
        }
    }

    let labels = match labels {
        Some(path) => LabelMapModel::open(path)?,
        None if configuration.category() == FilterCategory::Hair => {
            return Err("hair filters need --labels".into());
        }
        // Never consulted for size filters.
        None => LabelMapModel {
            labels: GrayImage::new(1, 1),
        },
    };

    let engine = FilterEngine::cpu()?;
    let worker = SegmentationWorker::spawn(labels, WorkerConfig::default().backend(engine.shared_backend()))?;
    let orchestrator = DetectionOrchestrator::new(PrecomputedFaces { result: faces }, worker);
    let session = EditSession::new(Photo::new(image)?, engine, orchestrator);

    if verbose {
        eprintln!(
            "Applying {} at {:.2}...",
            configuration.filter.display_name(),
            configuration.intensity
        );
    }
    match session.apply(configuration).await? {
        ApplyOutcome::Applied(processed) => {
            processed.save(output)?;
            if verbose {
                eprintln!("Output written to {:?}", output);
            }
        }
        ApplyOutcome::Superseded => return Err("filter request was superseded".into()),
    }
    Ok(())
}

fn list_filters(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let listing: Vec<FilterListing> = FilterCategory::ALL
        .iter()
        .flat_map(|category| category.filter_types())
        .map(|t| FilterListing {
            key: t.key().to_string(),
            name: t.display_name(),
            group: t.group().name().to_string(),
            category: t.category().name().to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for category in FilterCategory::ALL {
        println!("{}", category);
        for group in category.groups() {
            println!("  {}", group);
            for t in group.filter_types() {
                println!("    {:<28} {}", t.key(), t.display_name());
            }
        }
    }
    Ok(())
}

fn overlay(
    verbose: bool,
    image_path: &Path,
    faces: Option<&Path>,
    labels: Option<&Path>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::open(image_path)?.to_rgba8();
    let size = Size::from_dimensions(image.dimensions());
    let mut canvas = image.clone();

    if let Some(path) = labels {
        let mut model = LabelMapModel::open(path)?;
        let hair = segment_with(&mut model, &image, &CpuBackend::new())?;
        if verbose {
            eprintln!("Hair coverage: {:.1}%", hair.coverage() * 100.0);
        }
        canvas = render_hair_mask(&canvas, &hair);
    }

    if let Some(path) = faces {
        let faces = load_faces(path, size)?;
        if verbose {
            eprintln!("Drawing {} face(s)", faces.faces.len());
        }
        canvas = render_landmarks(&canvas, &faces);
    }

    canvas.save(output)?;
    if verbose {
        eprintln!("Output written to {:?}", output);
    }
    Ok(())
}
