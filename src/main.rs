//! nownext-rs: headless Now & Next board service.

mod api;
mod catalog;
mod config;
mod engine;
mod error;
mod favorites;
mod sequences;
mod service;
mod speech;
mod storage;
mod store;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speech::gateway::{PlaybackMechanism, SpeechGateway};
use speech::synth::{EspeakProvider, VoicePreferences};

#[derive(Parser, Debug)]
#[command(name = "nownext-rs", about = "Now & Next board service")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the audio asset sweep and exit
    #[arg(long)]
    check_assets: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_mechanism(config: &config::Config) -> PlaybackMechanism {
    match config.speech.mode.as_str() {
        "synth" => PlaybackMechanism::Synth {
            provider: Arc::new(EspeakProvider::new(&config.synth.language)),
            preferences: VoicePreferences {
                requested: if config.synth.voice.is_empty() {
                    None
                } else {
                    Some(config.synth.voice.clone())
                },
                language: config.synth.language.clone(),
            },
            rate: config.synth.rate,
            pitch: config.synth.pitch,
            volume: config.synth.volume,
            voices_ready_timeout: Duration::from_millis(config.synth.voices_ready_timeout_ms),
        },
        mode => {
            if mode != "clips" {
                warn!("Unknown speech mode \"{mode}\", using clips");
            }
            PlaybackMechanism::Clips {
                audio_root: PathBuf::from(&config.clips.audio_dir),
                extension: config.clips.extension.clone(),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("nownext-rs starting");

    let config = config::Config::load(args.config.as_deref());
    let catalog = catalog::SymbolCatalog::load(&config.catalog.symbols_path);
    info!("Catalog ready: {} symbols", catalog.len());

    if args.check_assets {
        let report = speech::clips::sweep(
            std::path::Path::new(&config.clips.audio_dir),
            &config.clips.extension,
            &catalog,
        );
        for name in &report.missing {
            info!("Missing audio for \"{name}\"");
        }
        return Ok(());
    }

    let board_storage = storage::BoardStorage::from_config_dir(&config.storage.data_dir);
    let store = store::SequenceStore::load(board_storage.clone());
    let favorites = favorites::FavoriteSet::load(board_storage.clone());

    if config.speech.mode == "clips" {
        speech::clips::sweep(
            std::path::Path::new(&config.clips.audio_dir),
            &config.clips.extension,
            &catalog,
        );
    }

    let gateway = SpeechGateway::start(build_mechanism(&config));
    info!("Speech gateway ready (mode: {})", config.speech.mode);

    let mut board = service::BoardService::new(
        catalog,
        store,
        favorites,
        board_storage,
        gateway,
        config.speech.auto_announce,
    );
    board.restore_position();

    if !config.api.enabled {
        warn!("Board API disabled in config, nothing to serve");
        return Ok(());
    }

    let state: api::SharedBoard = Arc::new(Mutex::new(board));
    api::serve(state, config.api.port).await?;

    Ok(())
}
