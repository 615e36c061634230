//! IndexTTS2 emotion CLI - resolve and classify emotion inputs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use indextts2_emotion::inference::{EmotionRequest, EmotionResolver};
use indextts2_emotion::models::qwen::{DeviceSelection, QwenClassifierFactory};
use indextts2_emotion::{
    ClassificationMode, ClassifierSource, ClassifierState, EmotionLabel, EmotionVector, ModelConfig,
    ResilientClassifier, VERSION,
};

/// IndexTTS2 emotion resolution
#[derive(Parser, Debug)]
#[command(name = "indextts2-emotion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use CPU instead of GPU
    #[arg(long, global = true)]
    cpu: bool,

    /// Path to model config file
    #[arg(short, long, global = true, default_value = "checkpoints/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve emotion inputs into the directive sent to synthesis
    Resolve {
        /// Emotion vector as JSON or comma-separated values
        /// Order: happy,angry,sad,afraid,disgusted,melancholic,surprised,calm
        #[arg(long)]
        emotion_vector: Option<String>,

        /// Text describing the emotion, classified by the Qwen model
        #[arg(long)]
        emotion_text: Option<String>,

        /// Path to emotion reference audio
        #[arg(long)]
        emotion_audio: Option<PathBuf>,

        /// Emotion blending alpha (0.0 - 1.0)
        #[arg(long, default_value = "1.0")]
        emotion_scale: f32,

        /// Pick emotion embeddings randomly
        #[arg(long)]
        randomize: bool,

        /// Classify emotion text now instead of leaving it to synthesis
        #[arg(long)]
        eager: bool,

        /// Speaker audio, used to show the final conditioning
        #[arg(short, long)]
        speaker: Option<PathBuf>,
    },

    /// Classify the emotion of a text
    Classify {
        /// Text to classify
        #[arg(short, long)]
        text: String,
    },

    /// Show configuration and classifier status
    Info {
        /// Also try to load the emotion model
        #[arg(long)]
        load: bool,
    },
}

/// `classify` output, labels kept in vector order
#[derive(Serialize)]
struct ClassifyOutput<'a> {
    state: ClassifierState,
    dominant: EmotionLabel,
    vector: Vec<f32>,
    labels: &'a EmotionVector,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

fn load_config(path: &Path) -> Result<ModelConfig> {
    if path.exists() {
        ModelConfig::load(path).context("Failed to load config")
    } else {
        info!("Config {:?} not found, using defaults", path);
        Ok(ModelConfig::default())
    }
}

fn load_classifier(
    config_path: &Path,
    config: &ModelConfig,
    cpu: bool,
) -> Result<Arc<ResilientClassifier>> {
    let model_dir = config_path.parent().unwrap_or(Path::new("."));
    let selection = DeviceSelection::detect(!cpu)?;
    let factory = QwenClassifierFactory::new(
        config.qwen_emo_dir(model_dir),
        selection,
        config.emotion.clone(),
    );

    let pb = create_progress_bar("Loading emotion model...");
    let classifier = ClassifierSource::Factory(Box::new(factory)).into_guarded();
    pb.finish_with_message(format!("Emotion classifier {}", classifier.state()));
    Ok(classifier)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    info!("IndexTTS2 emotion v{}", VERSION);
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Resolve {
            emotion_vector,
            emotion_text,
            emotion_audio,
            emotion_scale,
            randomize,
            eager,
            speaker,
        } => {
            let request = EmotionRequest {
                emotion_vector,
                emotion_text,
                emotion_audio,
                emotion_scale,
                randomize_emotion: randomize,
            };
            request.validate()?;

            let mode = if eager {
                ClassificationMode::Eager
            } else {
                config.emotion.mode
            };
            let needs_classifier = request.emotion_text().is_some()
                && (mode == ClassificationMode::Eager || speaker.is_some());
            let classifier = if needs_classifier {
                Some(load_classifier(&cli.config, &config, cli.cpu)?)
            } else {
                None
            };

            let resolver = EmotionResolver::with_mode(classifier, mode);
            let directive = resolver.resolve(&request)?;
            let mut output = serde_json::json!({ "directive": directive });
            if let Some(speaker) = speaker {
                let conditioning = directive.conditioning(resolver.classifier(), &speaker);
                output["conditioning"] = serde_json::to_value(conditioning)?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Commands::Classify { text } => {
            let classifier = load_classifier(&cli.config, &config, cli.cpu)?;
            let vector = classifier.infer(&text);
            let output = ClassifyOutput {
                state: classifier.state(),
                dominant: vector.dominant(),
                vector: vector.to_vec(),
                labels: &vector,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        Commands::Info { load } => {
            println!("{:#?}", config);
            if load {
                let classifier = load_classifier(&cli.config, &config, cli.cpu)?;
                println!("Classifier: {}", classifier.state());
                if let Some(err) = classifier.construction_error() {
                    println!("Reason: {}", err);
                }
            }
            Ok(())
        }
    }
}
