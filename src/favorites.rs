//! Favorite symbols: a persisted display filter.

use std::collections::BTreeSet;

use crate::storage::{BoardStorage, KEY_FAVORITE_SYMBOLS};

/// Set of symbol filenames marked favorite. Ordering is irrelevant; the
/// set round-trips through storage on every toggle.
pub struct FavoriteSet {
    filenames: BTreeSet<String>,
    storage: BoardStorage,
}

impl FavoriteSet {
    /// Load favorites from storage. An absent or malformed key is an
    /// empty set.
    pub fn load(storage: BoardStorage) -> Self {
        let filenames = storage
            .read::<Vec<String>>(KEY_FAVORITE_SYMBOLS)
            .unwrap_or_default()
            .into_iter()
            .collect();
        Self { filenames, storage }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    /// Flip a filename's favorite state. Returns the new state.
    pub fn toggle(&mut self, filename: &str) -> bool {
        let now_favorite = if self.filenames.remove(filename) {
            false
        } else {
            self.filenames.insert(filename.to_string());
            true
        };
        self.persist();
        now_favorite
    }

    pub fn filenames(&self) -> Vec<String> {
        self.filenames.iter().cloned().collect()
    }

    fn persist(&self) {
        let list: Vec<&String> = self.filenames.iter().collect();
        self.storage.write(KEY_FAVORITE_SYMBOLS, &list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BoardStorage::new(dir.path().to_path_buf());

        let mut favorites = FavoriteSet::load(storage.clone());
        assert!(favorites.toggle("bath.png"));
        assert!(favorites.toggle("toilet.png"));
        assert!(!favorites.toggle("bath.png"));

        let reloaded = FavoriteSet::load(storage);
        assert!(reloaded.contains("toilet.png"));
        assert!(!reloaded.contains("bath.png"));
    }

    #[test]
    fn test_absent_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let favorites = FavoriteSet::load(BoardStorage::new(dir.path().to_path_buf()));
        assert!(favorites.filenames().is_empty());
    }
}
