//! Serial playback gateway.
//!
//! One owned queue, one worker task, at most one clip or utterance
//! playing at any time — overlapping voices are the main comprehension
//! hazard for the board's users, so concurrency is designed out rather
//! than handled. Requests either line up behind the current playback or
//! explicitly cancel it.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::speech::clips;
use crate::speech::synth::{
    select_voice, wait_for_voices, Utterance, VoicePreferences, VoiceProvider,
};

/// What to do with playback already in flight when a new request lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Line up behind the current playback (default).
    Enqueue,
    /// Drop everything pending and stop the current playback first.
    CancelExisting,
}

/// Optional completion callbacks. Each fires at most once per request.
#[derive(Default)]
pub struct PlaybackCallbacks {
    pub on_start: Option<Box<dyn FnOnce() + Send>>,
    pub on_end: Option<Box<dyn FnOnce() + Send>>,
    pub on_error: Option<Box<dyn FnOnce(BoardError) + Send>>,
}

/// A playback request, mechanism-agnostic: the gateway maps it onto
/// whichever mechanism the deployment selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRequest {
    /// Speak a display name (clip lookup, or a plain utterance).
    Word(String),
    /// Spell characters out one by one (letter-name pronunciation).
    SpellOut(String),
}

impl PlayRequest {
    fn label(&self) -> &str {
        match self {
            Self::Word(word) | Self::SpellOut(word) => word,
        }
    }
}

/// The deployment-selected playback mechanism. Exactly one per process;
/// the two are never hybridized.
pub enum PlaybackMechanism {
    Clips {
        audio_root: PathBuf,
        extension: String,
    },
    Synth {
        provider: Arc<dyn VoiceProvider>,
        preferences: VoicePreferences,
        rate: f32,
        pitch: f32,
        volume: f32,
        voices_ready_timeout: Duration,
    },
}

struct QueuedPlayback {
    request: PlayRequest,
    callbacks: PlaybackCallbacks,
}

pub struct SpeechGateway {
    mechanism: PlaybackMechanism,
    queue: Mutex<VecDeque<QueuedPlayback>>,
    notify: Notify,
    cancel_flag: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
    active_sink: Arc<Mutex<Option<Sink>>>,
    // Kept alive for the gateway's lifetime; None when no audio device
    // could be opened (clip playback then reports, synth is unaffected).
    output_stream: Option<OutputStream>,
}

impl SpeechGateway {
    pub fn new(mechanism: PlaybackMechanism) -> Self {
        let output_stream = match &mechanism {
            PlaybackMechanism::Clips { .. } => match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!("Failed to open audio output: {e}, clip playback disabled");
                    None
                }
            },
            PlaybackMechanism::Synth { .. } => None,
        };

        Self {
            mechanism,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            speaking: Arc::new(AtomicBool::new(false)),
            active_sink: Arc::new(Mutex::new(None)),
            output_stream,
        }
    }

    /// Build the gateway and spawn its worker task.
    pub fn start(mechanism: PlaybackMechanism) -> Arc<Self> {
        let gateway = Arc::new(Self::new(mechanism));
        let worker = gateway.clone();
        tokio::spawn(async move {
            worker.run().await;
        });
        gateway
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Queue a playback request. `CancelExisting` flushes the queue and
    /// stops the current playback before this request lines up.
    pub fn enqueue(&self, request: PlayRequest, policy: QueuePolicy, callbacks: PlaybackCallbacks) {
        if policy == QueuePolicy::CancelExisting {
            self.stop_current();
        }

        debug!("Queueing playback for \"{}\"", request.label());
        self.queue
            .lock()
            .unwrap()
            .push_back(QueuedPlayback { request, callbacks });
        self.notify.notify_one();
    }

    /// Cancel everything: pending queue and in-flight playback.
    pub fn cancel(&self) {
        self.stop_current();
        info!("Playback cancelled");
    }

    fn stop_current(&self) {
        self.queue.lock().unwrap().clear();
        self.cancel_flag.store(true, Ordering::Relaxed);
        if let Some(sink) = self.active_sink.lock().unwrap().take() {
            sink.stop();
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            let item = self.queue.lock().unwrap().pop_front();
            let Some(mut item) = item else {
                self.notify.notified().await;
                continue;
            };

            self.cancel_flag.store(false, Ordering::Relaxed);
            self.speaking.store(true, Ordering::Relaxed);

            if let Some(on_start) = item.callbacks.on_start.take() {
                on_start();
            }

            let result = self.play(&item.request).await;
            self.speaking.store(false, Ordering::Relaxed);

            match result {
                Ok(()) => {
                    if let Some(on_end) = item.callbacks.on_end.take() {
                        on_end();
                    }
                }
                Err(e) => {
                    warn!("{e}");
                    if let Some(on_error) = item.callbacks.on_error.take() {
                        on_error(e);
                    }
                }
            }
        }
    }

    async fn play(&self, request: &PlayRequest) -> Result<(), BoardError> {
        match &self.mechanism {
            PlaybackMechanism::Clips {
                audio_root,
                extension,
            } => {
                let word = request.label().to_string();
                let source = open_clip(audio_root, extension, &word)?;
                self.play_source(source, &word).await
            }
            PlaybackMechanism::Synth {
                provider,
                preferences,
                rate,
                pitch,
                volume,
                voices_ready_timeout,
            } => {
                let mut utterance = match request {
                    PlayRequest::Word(word) => Utterance::text(word.clone()),
                    PlayRequest::SpellOut(characters) => Utterance::spell_out(characters),
                };
                utterance.rate = *rate;
                utterance.pitch = *pitch;
                utterance.volume = *volume;

                let voices = wait_for_voices(provider.as_ref(), *voices_ready_timeout).await;
                let selected = match select_voice(&voices, preferences) {
                    Some((tier, voice)) => {
                        debug!("Selected voice \"{}\" via {tier}", voice.name);
                        Some(voice.clone())
                    }
                    None => {
                        debug!("No voice matched, using platform default");
                        None
                    }
                };

                let provider = provider.clone();
                let cancel = self.cancel_flag.clone();
                let word = request.label().to_string();

                tokio::task::spawn_blocking(move || {
                    provider.speak(&utterance, selected.as_ref(), &cancel)
                })
                .await
                .unwrap_or_else(|e| Err(format!("synthesis task failed: {e}")))
                .map_err(|reason| BoardError::playback(word, reason))
            }
        }
    }

    /// Play a decoded source through a fresh sink, polling for completion
    /// or cancellation.
    async fn play_source(
        &self,
        source: Decoder<BufReader<File>>,
        word: &str,
    ) -> Result<(), BoardError> {
        let Some(stream) = &self.output_stream else {
            return Err(BoardError::playback(word, "no audio output device"));
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        *self.active_sink.lock().unwrap() = Some(sink);

        let cancel_flag = self.cancel_flag.clone();
        let active_sink = self.active_sink.clone();

        tokio::task::spawn_blocking(move || loop {
            let is_empty = {
                let guard = active_sink.lock().unwrap();
                match guard.as_ref() {
                    Some(s) => s.empty(),
                    None => true,
                }
            };

            if is_empty {
                return;
            }

            if cancel_flag.load(Ordering::Relaxed) {
                if let Some(sink) = active_sink.lock().unwrap().take() {
                    sink.stop();
                }
                return;
            }

            std::thread::sleep(Duration::from_millis(50));
        })
        .await
        .ok();

        *self.active_sink.lock().unwrap() = None;
        Ok(())
    }
}

/// Resolve a display name to a decodable clip, walking the case-fallback
/// candidates. Exhausting them yields a single `PlaybackError` — callers
/// do not retry further.
pub fn open_clip(
    audio_root: &Path,
    extension: &str,
    word: &str,
) -> Result<Decoder<BufReader<File>>, BoardError> {
    let paths = clips::candidates(audio_root, word, extension);
    if paths.is_empty() {
        return Err(BoardError::playback(word, "empty display name"));
    }

    let mut reason = String::from("audio asset not found");

    for path in &paths {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => {
                debug!("No clip at {}", path.display());
                continue;
            }
        };

        match Decoder::new(BufReader::new(file)) {
            Ok(source) => {
                debug!("Resolved clip {}", path.display());
                return Ok(source);
            }
            Err(e) => {
                warn!("Failed to decode {}: {e}", path.display());
                reason = format!("decode failed: {e}");
            }
        }
    }

    Err(BoardError::playback(word, reason))
}
