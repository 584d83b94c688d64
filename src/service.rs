//! Board orchestration: the UI-event surface over catalog, store,
//! engine, favorites and the speech gateway.
//!
//! Cross-component effects live here by design — deleting the selected
//! sequence clears the cursor in this layer, the store never reaches
//! into cursor state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::SymbolCatalog;
use crate::engine::{BoardDisplay, CursorState, PlaybackEngine};
use crate::error::BoardError;
use crate::favorites::FavoriteSet;
use crate::sequences::Sequence;
use crate::speech::gateway::{PlayRequest, PlaybackCallbacks, QueuePolicy, SpeechGateway};
use crate::store::SequenceStore;
use crate::storage::{BoardStorage, KEY_PLAYBACK_POSITION};

/// Last-used playback position, durably stored.
#[derive(Debug, Serialize, Deserialize)]
struct PlaybackPosition {
    sequence_id: String,
    step: usize,
}

pub struct BoardService {
    catalog: SymbolCatalog,
    store: SequenceStore,
    engine: PlaybackEngine,
    favorites: FavoriteSet,
    storage: BoardStorage,
    gateway: Arc<SpeechGateway>,
    auto_announce: bool,
}

impl BoardService {
    pub fn new(
        catalog: SymbolCatalog,
        store: SequenceStore,
        favorites: FavoriteSet,
        storage: BoardStorage,
        gateway: Arc<SpeechGateway>,
        auto_announce: bool,
    ) -> Self {
        Self {
            catalog,
            store,
            engine: PlaybackEngine::new(),
            favorites,
            storage,
            gateway,
            auto_announce,
        }
    }

    /// Resume the last-used playback position, if one round-trips.
    pub fn restore_position(&mut self) {
        if let Some(position) = self.storage.read::<PlaybackPosition>(KEY_PLAYBACK_POSITION) {
            self.engine
                .restore(&self.store, &position.sequence_id, position.step);
            if let CursorState::Active { sequence_id, step } = self.engine.state() {
                info!("Restored playback position: {sequence_id} step {step}");
            }
        }
    }

    fn persist_position(&self) {
        match (
            self.engine.selected_sequence_id(),
            self.engine.current_step_index(),
        ) {
            (Some(sequence_id), Some(step)) => {
                self.storage.write(
                    KEY_PLAYBACK_POSITION,
                    &PlaybackPosition {
                        sequence_id: sequence_id.to_string(),
                        step,
                    },
                );
            }
            _ => self.storage.remove(KEY_PLAYBACK_POSITION),
        }
    }

    pub fn display(&self) -> BoardDisplay {
        self.engine.display(&self.store, &self.catalog)
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &SequenceStore {
        &self.store
    }

    pub fn favorites(&self) -> &FavoriteSet {
        &self.favorites
    }

    pub fn is_speaking(&self) -> bool {
        self.gateway.is_speaking()
    }

    pub fn pending_playback(&self) -> usize {
        self.gateway.pending()
    }

    pub fn selected_sequence_id(&self) -> Option<&str> {
        self.engine.selected_sequence_id()
    }

    // --- UI events ---

    pub fn select_sequence(&mut self, id: &str) -> BoardDisplay {
        self.engine.select_sequence(&self.store, id);
        self.persist_position();
        self.announce_current();
        self.display()
    }

    pub fn deselect_sequence(&mut self) -> BoardDisplay {
        self.engine.deselect();
        self.persist_position();
        self.display()
    }

    pub fn step_forward(&mut self) -> BoardDisplay {
        if self.engine.step_forward(&self.store) {
            self.persist_position();
            self.announce_current();
        }
        self.display()
    }

    pub fn step_backward(&mut self) -> BoardDisplay {
        if self.engine.step_backward(&self.store) {
            self.persist_position();
            self.announce_current();
        }
        self.display()
    }

    /// Save a sequence from the editor. Without an id this creates a new
    /// user sequence; with one it replaces that user sequence. Presets
    /// are rejected — editing those goes through `edit_step`.
    pub fn save_sequence(
        &mut self,
        id: Option<String>,
        name: &str,
        symbol_ids: Vec<String>,
    ) -> Result<Sequence, BoardError> {
        let sequence = match id {
            None => self.store.create(name, symbol_ids)?,
            Some(id) => {
                if self.store.is_preset(&id) {
                    return Err(BoardError::validation(
                        "preset sequences are read-only, edit a step to make a copy",
                    ));
                }
                let mut sequence = self.store.create(name, symbol_ids)?;
                sequence.id = id;
                sequence
            }
        };

        Ok(self.store.save(sequence))
    }

    /// Delete a user sequence. Clearing the cursor when the deleted
    /// sequence was selected happens here, not in the store.
    pub fn delete_sequence(&mut self, id: &str) -> bool {
        let removed = self.store.delete(id);
        if removed && self.engine.selected_sequence_id() == Some(id) {
            self.engine.deselect();
            self.persist_position();
        }
        removed
    }

    /// Replace one step of a sequence. Presets are immutable, so editing
    /// one materializes a user clone, which becomes the selection target.
    pub fn edit_step(
        &mut self,
        id: &str,
        step: usize,
        symbol_id: &str,
    ) -> Result<Sequence, BoardError> {
        if self.store.is_preset(id) {
            let clone = self
                .store
                .clone_as_user_sequence(id, &[(step, symbol_id.to_string())])
                .ok_or_else(|| BoardError::validation(format!("unknown sequence {id}")))?;

            let was_selected = self.engine.selected_sequence_id() == Some(id);
            if was_selected {
                self.engine.select_sequence(&self.store, &clone.id);
                self.persist_position();
            }
            return Ok(clone);
        }

        let mut sequence = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::validation(format!("unknown sequence {id}")))?;

        match sequence.symbol_ids.get_mut(step) {
            Some(slot) => *slot = symbol_id.to_string(),
            None => {
                return Err(BoardError::validation(format!(
                    "step {step} out of range for sequence {id}"
                )))
            }
        }

        Ok(self.store.save(sequence))
    }

    pub fn toggle_favorite(&mut self, filename: &str) -> bool {
        if self.catalog.by_filename(filename).is_none() {
            // Harmless (favorites are only a display filter), but worth a
            // trace when the UI sends a filename the catalog dropped.
            warn!("Toggling favorite for unknown filename {filename}");
        }
        self.favorites.toggle(filename)
    }

    // --- Speech ---

    /// Speak arbitrary text (or spell it out) on user request. Queued
    /// behind any current playback.
    pub fn speak(&self, text: &str, spell_out: bool) {
        let request = if spell_out {
            PlayRequest::SpellOut(text.to_string())
        } else {
            PlayRequest::Word(text.to_string())
        };
        self.gateway
            .enqueue(request, QueuePolicy::Enqueue, Self::warn_callbacks());
    }

    pub fn cancel_speech(&self) {
        self.gateway.cancel();
    }

    /// Auto-announce the symbol now shown. Cancels in-flight speech so
    /// rapid navigation never piles up stale announcements.
    fn announce_current(&self) {
        if !self.auto_announce {
            return;
        }

        let display = self.display();
        let Some(name) = display.now.and_then(|slot| slot.display_name) else {
            return;
        };

        self.gateway.enqueue(
            PlayRequest::Word(name),
            QueuePolicy::CancelExisting,
            Self::warn_callbacks(),
        );
    }

    fn warn_callbacks() -> PlaybackCallbacks {
        PlaybackCallbacks {
            on_error: Some(Box::new(|e| warn!("Playback warning: {e}"))),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::gateway::PlaybackMechanism;

    fn fixture() -> (tempfile::TempDir, BoardService) {
        let dir = tempfile::tempdir().unwrap();
        let storage = BoardStorage::new(dir.path().to_path_buf());
        let store = SequenceStore::load(storage.clone());
        let favorites = FavoriteSet::load(storage.clone());
        // No worker task: service tests only observe queue effects.
        let gateway = Arc::new(SpeechGateway::new(PlaybackMechanism::Clips {
            audio_root: dir.path().to_path_buf(),
            extension: "mp3".into(),
        }));
        let service = BoardService::new(
            SymbolCatalog::builtin(),
            store,
            favorites,
            storage,
            gateway,
            true,
        );
        (dir, service)
    }

    #[test]
    fn test_select_and_navigate_persists_position() {
        let (dir, mut service) = fixture();
        service.select_sequence("morning-routine");
        service.step_forward();

        let storage = BoardStorage::new(dir.path().to_path_buf());
        let position: PlaybackPosition = storage.read(KEY_PLAYBACK_POSITION).unwrap();
        assert_eq!(position.sequence_id, "morning-routine");
        assert_eq!(position.step, 1);
    }

    #[test]
    fn test_restore_position_round_trip() {
        let (dir, mut service) = fixture();
        service.select_sequence("morning-routine");
        service.step_forward();
        service.step_forward();

        let storage = BoardStorage::new(dir.path().to_path_buf());
        let store = SequenceStore::load(storage.clone());
        let favorites = FavoriteSet::load(storage.clone());
        let gateway = Arc::new(SpeechGateway::new(PlaybackMechanism::Clips {
            audio_root: dir.path().to_path_buf(),
            extension: "mp3".into(),
        }));
        let mut fresh = BoardService::new(
            SymbolCatalog::builtin(),
            store,
            favorites,
            storage,
            gateway,
            false,
        );
        fresh.restore_position();
        assert_eq!(fresh.selected_sequence_id(), Some("morning-routine"));
        assert_eq!(fresh.display().step_index, 2);
    }

    #[test]
    fn test_delete_selected_clears_cursor() {
        let (_dir, mut service) = fixture();
        let saved = service
            .save_sequence(None, "School Run", vec!["toilet".into()])
            .unwrap();

        service.select_sequence(&saved.id);
        assert!(service.delete_sequence(&saved.id));
        assert_eq!(service.selected_sequence_id(), None);
    }

    #[test]
    fn test_delete_other_keeps_cursor() {
        let (_dir, mut service) = fixture();
        let doomed = service
            .save_sequence(None, "Doomed", vec!["bath".into()])
            .unwrap();

        service.select_sequence("morning-routine");
        service.step_forward();
        assert!(service.delete_sequence(&doomed.id));
        assert_eq!(service.selected_sequence_id(), Some("morning-routine"));
        assert_eq!(service.display().step_index, 1);
    }

    #[test]
    fn test_save_rejects_preset_id() {
        let (_dir, mut service) = fixture();
        let err = service
            .save_sequence(
                Some("bedtime-routine".into()),
                "Bedtime Routine",
                vec!["bath".into()],
            )
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn test_edit_preset_step_selects_clone() {
        let (_dir, mut service) = fixture();
        service.select_sequence("mealtime-routine");

        let clone = service.edit_step("mealtime-routine", 1, "dinner").unwrap();
        assert_eq!(clone.name, "Mealtime_001");
        assert_eq!(clone.symbol_ids[1], "dinner");
        // The clone became the selection target, back at step 0.
        assert_eq!(service.selected_sequence_id(), Some(clone.id.as_str()));
        assert_eq!(service.display().step_index, 0);
    }

    #[test]
    fn test_edit_user_sequence_in_place() {
        let (_dir, mut service) = fixture();
        let saved = service
            .save_sequence(None, "School Run", vec!["toilet".into(), "car".into()])
            .unwrap();

        let edited = service.edit_step(&saved.id, 1, "train").unwrap();
        assert_eq!(edited.id, saved.id);
        assert_eq!(edited.symbol_ids[1], "train");
    }

    #[test]
    fn test_edit_step_out_of_range() {
        let (_dir, mut service) = fixture();
        let saved = service
            .save_sequence(None, "School Run", vec!["toilet".into()])
            .unwrap();
        assert!(service.edit_step(&saved.id, 99, "train").is_err());
    }

    #[test]
    fn test_auto_announce_queues_on_navigation() {
        let (_dir, mut service) = fixture();
        service.select_sequence("morning-routine");
        // Selection announced; no worker is draining the queue.
        assert_eq!(service.gateway.pending(), 1);

        service.step_forward();
        // CancelExisting flushed the stale announcement first.
        assert_eq!(service.gateway.pending(), 1);
    }
}
