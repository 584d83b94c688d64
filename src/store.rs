//! Sequence store: owns preset and user sequences.
//!
//! The store is the sole writer of durable sequence state. Presets are
//! immutable; editing one goes through `clone_as_user_sequence`. Cursor
//! state lives in the playback engine — deleting the selected sequence is
//! the caller's cue to clear it, the store never reaches across.

use chrono::Local;
use tracing::{info, warn};

use crate::error::BoardError;
use crate::sequences::{self, disambiguate_name, unique_sequence_id, Sequence};
use crate::storage::{BoardStorage, KEY_USER_SEQUENCES};

pub struct SequenceStore {
    presets: Vec<Sequence>,
    user: Vec<Sequence>,
    storage: BoardStorage,
}

impl SequenceStore {
    /// Load user sequences from storage. Records that fail to parse are
    /// dropped with a warning; a corrupt file never blocks startup.
    pub fn load(storage: BoardStorage) -> Self {
        let raw = storage.read_list(KEY_USER_SEQUENCES);
        let total = raw.len();

        let user: Vec<Sequence> = raw
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Sequence>(record) {
                Ok(sequence) => Some(sequence),
                Err(e) => {
                    warn!("Dropping corrupt user sequence record: {e}");
                    None
                }
            })
            .collect();

        if user.len() < total {
            warn!("Loaded {}/{total} user sequences, rest dropped", user.len());
        } else if !user.is_empty() {
            info!("Loaded {} user sequences", user.len());
        }

        Self {
            presets: sequences::presets(),
            user,
            storage,
        }
    }

    /// Presets first, then user sequences in saved order.
    pub fn list_all(&self) -> Vec<&Sequence> {
        self.presets.iter().chain(self.user.iter()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Sequence> {
        self.presets
            .iter()
            .find(|s| s.id == id)
            .or_else(|| self.user.iter().find(|s| s.id == id))
    }

    pub fn is_preset(&self, id: &str) -> bool {
        self.presets.iter().any(|s| s.id == id)
    }

    fn all_ids(&self) -> Vec<String> {
        self.list_all().iter().map(|s| s.id.clone()).collect()
    }

    fn all_names(&self) -> Vec<String> {
        self.list_all().iter().map(|s| s.name.clone()).collect()
    }

    /// Build a new user sequence with a fresh id. Not yet saved — callers
    /// surface validation failures before any write happens.
    pub fn create(&self, name: &str, symbol_ids: Vec<String>) -> Result<Sequence, BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::validation("sequence name must not be empty"));
        }
        if symbol_ids.is_empty() {
            return Err(BoardError::validation(
                "sequence must contain at least one symbol",
            ));
        }

        let id = unique_sequence_id(name, &self.all_ids());
        Ok(Sequence::new(id, name, symbol_ids))
    }

    /// Save a user sequence: replace in place when the id is already
    /// known, append otherwise. The finished sentinel is normalized and
    /// the list is persisted. Returns the saved form.
    pub fn save(&mut self, mut sequence: Sequence) -> Sequence {
        sequence.normalize_finished();
        sequence.saved_at = Some(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());

        match self.user.iter_mut().find(|s| s.id == sequence.id) {
            Some(existing) => {
                *existing = sequence.clone();
                info!("Updated sequence \"{}\"", sequence.name);
            }
            None => {
                info!("Saved new sequence \"{}\"", sequence.name);
                self.user.push(sequence.clone());
            }
        }

        self.persist();
        sequence
    }

    /// Delete a user sequence. No-op for presets and unknown ids. Returns
    /// whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|s| s.id != id);
        let removed = self.user.len() < before;

        if removed {
            info!("Deleted sequence {id}");
            self.persist();
        }

        removed
    }

    /// Materialize a user copy of an existing sequence with the given
    /// `(step index, symbol id)` overrides applied. The copy gets a
    /// disambiguated name and a fresh id, and is saved immediately.
    /// Returns `None` when the source id does not resolve.
    pub fn clone_as_user_sequence(
        &mut self,
        source_id: &str,
        overrides: &[(usize, String)],
    ) -> Option<Sequence> {
        let source = self.get(source_id)?.clone();

        let name = disambiguate_name(&source.name, &self.all_names());
        let id = unique_sequence_id(&name, &self.all_ids());

        let mut symbol_ids = source.symbol_ids.clone();
        for (index, symbol_id) in overrides {
            match symbol_ids.get_mut(*index) {
                Some(slot) => *slot = symbol_id.clone(),
                None => warn!("Ignoring override at step {index}, sequence has {} steps", symbol_ids.len()),
            }
        }

        let mut clone = Sequence::new(id, name, symbol_ids);
        clone.description = source.description.clone();

        Some(self.save(clone))
    }

    fn persist(&self) {
        self.storage.write(KEY_USER_SEQUENCES, &self.user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequences::FINISHED_ID;

    fn temp_store() -> (tempfile::TempDir, SequenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage = BoardStorage::new(dir.path().to_path_buf());
        let store = SequenceStore::load(storage);
        (dir, store)
    }

    #[test]
    fn test_list_all_presets_first() {
        let (_dir, mut store) = temp_store();
        let created = store.create("School Run", vec!["toilet".into()]).unwrap();
        store.save(created);

        let all = store.list_all();
        assert_eq!(all[0].id, "bedtime-routine");
        assert_eq!(all.last().unwrap().name, "School Run");
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let (_dir, store) = temp_store();
        let err = store.create("   ", vec!["toilet".into()]).unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn test_create_rejects_empty_steps() {
        let (_dir, store) = temp_store();
        let err = store.create("School Run", vec![]).unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));
    }

    #[test]
    fn test_save_normalizes_finished_sentinel() {
        let (_dir, mut store) = temp_store();
        let created = store
            .create(
                "School Run",
                vec![FINISHED_ID.into(), "toilet".into(), FINISHED_ID.into()],
            )
            .unwrap();
        let saved = store.save(created);
        assert_eq!(saved.symbol_ids, vec!["toilet", FINISHED_ID]);

        // Saving again keeps the normalized list stable.
        let resaved = store.save(saved.clone());
        assert_eq!(resaved.symbol_ids, saved.symbol_ids);
    }

    #[test]
    fn test_save_replaces_in_place() {
        let (_dir, mut store) = temp_store();
        let a = store.save(store.create("A", vec!["toilet".into()]).unwrap());
        store.save(store.create("B", vec!["bath".into()]).unwrap());

        let mut edited = a.clone();
        edited.symbol_ids = vec!["dinner".into()];
        store.save(edited);

        let user: Vec<_> = store.list_all().into_iter().skip(3).collect();
        assert_eq!(user.len(), 2);
        assert_eq!(user[0].id, a.id);
        assert_eq!(user[0].symbol_ids, vec!["dinner", FINISHED_ID]);
    }

    #[test]
    fn test_delete_ignores_presets() {
        let (_dir, mut store) = temp_store();
        assert!(!store.delete("bedtime-routine"));
        assert!(store.get("bedtime-routine").is_some());
    }

    #[test]
    fn test_delete_removes_user_sequence() {
        let (_dir, mut store) = temp_store();
        let saved = store.save(store.create("School Run", vec!["toilet".into()]).unwrap());
        assert!(store.delete(&saved.id));
        assert!(store.get(&saved.id).is_none());
        assert!(!store.delete(&saved.id));
    }

    #[test]
    fn test_clone_preset_disambiguates_name() {
        let (_dir, mut store) = temp_store();

        let first = store.clone_as_user_sequence("bedtime-routine", &[]).unwrap();
        assert_eq!(first.name, "Bedtime Routine_001");

        let second = store.clone_as_user_sequence("bedtime-routine", &[]).unwrap();
        assert_eq!(second.name, "Bedtime Routine_002");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_clone_applies_step_overrides() {
        let (_dir, mut store) = temp_store();
        let clone = store
            .clone_as_user_sequence("mealtime-routine", &[(1, "dinner".into())])
            .unwrap();
        assert_eq!(clone.symbol_ids[1], "dinner");
        // Source preset is untouched.
        assert_eq!(store.get("mealtime-routine").unwrap().symbol_ids[1], "cheese-toast");
    }

    #[test]
    fn test_clone_unknown_source_is_none() {
        let (_dir, mut store) = temp_store();
        assert!(store.clone_as_user_sequence("nope", &[]).is_none());
    }

    #[test]
    fn test_reload_round_trip_drops_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BoardStorage::new(dir.path().to_path_buf());

        {
            let mut store = SequenceStore::load(storage.clone());
            store.save(store.create("School Run", vec!["toilet".into()]).unwrap());
        }

        // Corrupt the persisted list by appending a bogus record.
        let path = dir.path().join("user_sequences.json");
        let mut records: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        records.push(serde_json::json!({"bogus": true}));
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let store = SequenceStore::load(storage);
        let user: Vec<_> = store.list_all().into_iter().skip(3).collect();
        assert_eq!(user.len(), 1);
        assert_eq!(user[0].name, "School Run");
    }
}
