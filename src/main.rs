//! live-ocr - Live camera OCR preprocessing
//!
//! Command line front end for the frame pipeline: preprocess still images,
//! install recognizer language data and inspect the configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use live_ocr::analysis::{run_setup, RecognizerFactory};
use live_ocr::config::{self, AppConfig};
use live_ocr::storage::{self, LanguageDataStore};
use live_ocr::vision::{ConfidenceGate, GateDecision, PipelineMode, SkewEstimate, VisionPipeline};
use live_ocr::Frame;

/// live-ocr - Camera frame preprocessing for text recognition
#[derive(Parser, Debug)]
#[command(name = "live-ocr")]
#[command(about = "Binarize, deskew and recognize text in camera frames")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the preprocessing stages on an image file and write the result
    Preprocess {
        /// Input image, read as a luma frame
        input: PathBuf,

        /// Where to write the processed image
        #[arg(short, long, default_value = "preprocessed.png")]
        output: PathBuf,

        /// Estimate and correct skew (accurate path)
        #[arg(long)]
        deskew: bool,

        /// Clockwise rotation hint in degrees
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rotation: i32,
    },

    /// Copy recognizer language data into the app data directory
    InstallData {
        /// Directory holding `<lang>.traineddata`
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Language code
        #[arg(long)]
        lang: Option<String>,
    },

    /// Recognize text in image files (requires the `tesseract` feature)
    Recognize {
        /// Input images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Estimate and correct skew (accurate path)
        #[arg(long)]
        deskew: bool,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Preprocess {
            input,
            output,
            deskew,
            rotation,
        } => preprocess(&config, &input, &output, deskew, rotation),
        Command::InstallData { assets, lang } => install_data(&config, assets, lang),
        Command::Recognize { inputs, deskew } => recognize(&config, &inputs, deskew),
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Load configuration from the given file, the default location, or defaults
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => storage::default_config_path()?,
    };

    let config = config::load_or_default(&path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;
    info!("Using configuration {:?}", path);
    Ok(config)
}

fn load_frame(input: &Path, rotation: i32) -> Result<Frame> {
    let gray = image::open(input)
        .with_context(|| format!("Failed to open {:?}", input))?
        .to_luma8();
    let (width, height) = gray.dimensions();
    Ok(Frame::luma(width, height, gray.into_raw(), rotation))
}

fn skew_report(skew: &SkewEstimate) -> serde_json::Value {
    serde_json::json!({
        "angle": skew.angle,
        "center": [skew.center.0, skew.center.1],
        "corners": skew.corners.iter().map(|&(x, y)| [x, y]).collect::<Vec<_>>(),
        "foreground_pixels": skew.foreground_pixels,
    })
}

fn build_pipeline(config: &AppConfig, deskew: bool) -> VisionPipeline {
    let mut pipeline = VisionPipeline::new(
        config.pipeline.clone(),
        ConfidenceGate::new(config.recognizer.confidence_threshold),
    );
    if deskew {
        pipeline.set_mode(PipelineMode::Accurate);
    }
    pipeline
}

fn preprocess(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    deskew: bool,
    rotation: i32,
) -> Result<()> {
    let pipeline = build_pipeline(config, deskew);
    let frame = load_frame(input, rotation)?;

    let prepared = pipeline.prepare(&frame)?;
    let (width, height) = prepared.image.dimensions();
    prepared
        .image
        .into_dynamic()
        .save(output)
        .with_context(|| format!("Failed to write {:?}", output))?;
    info!("Wrote {}x{} image to {:?}", width, height, output);

    let report = serde_json::json!({
        "input": input,
        "output": output,
        "mode": format!("{:?}", pipeline.mode()),
        "width": width,
        "height": height,
        "preprocess_time_ms": prepared.preprocess_time_ms,
        "skew": prepared.skew.as_ref().map(skew_report),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn data_store(config: &AppConfig) -> Result<LanguageDataStore> {
    match &config.recognizer.data_dir {
        Some(root) => Ok(LanguageDataStore::with_root(root.clone())),
        None => LanguageDataStore::new(),
    }
}

fn install_data(config: &AppConfig, assets: Option<PathBuf>, lang: Option<String>) -> Result<()> {
    let assets = assets.unwrap_or_else(|| config.recognizer.assets_dir.clone());
    let lang = lang.unwrap_or_else(|| config.recognizer.language.clone());

    let store = data_store(config)?;
    let data_path = store.ensure_language(&assets, &lang)?;
    println!("{}", store.traineddata_path(&lang).display());
    info!("Recognizer data path: {:?}", data_path);
    Ok(())
}

#[cfg(feature = "tesseract")]
fn recognizer_factory(config: &AppConfig) -> Result<RecognizerFactory> {
    use live_ocr::vision::{Recognizer, TesseractRecognizer};
    let mode = config.recognizer.page_seg_mode;
    Ok(Box::new(move || {
        Box::new(TesseractRecognizer::new().with_page_seg_mode(mode)) as Box<dyn Recognizer>
    }))
}

#[cfg(not(feature = "tesseract"))]
fn recognizer_factory(_config: &AppConfig) -> Result<RecognizerFactory> {
    anyhow::bail!("live-ocr was built without the `tesseract` feature; no recognizer available")
}

fn recognize(config: &AppConfig, inputs: &[PathBuf], deskew: bool) -> Result<()> {
    let factory = recognizer_factory(config)?;
    let store = data_store(config)?;
    let mut session = run_setup(factory.as_ref(), &store, &config.recognizer)?;
    let pipeline = build_pipeline(config, deskew);

    for input in inputs {
        let frame = load_frame(input, 0)?;
        match pipeline.process(frame, &mut session) {
            Ok(outcome) => match outcome.decision {
                GateDecision::Forward(result) => {
                    println!("{} [{}]: {}", input.display(), result.confidence, result.text.trim());
                }
                GateDecision::Suppress { confidence } => {
                    println!("{} [{}]: (below threshold)", input.display(), confidence);
                }
            },
            Err(e) => eprintln!("{}: skipped ({})", input.display(), e),
        }
    }

    session.shutdown();
    Ok(())
}
