//! Symbol catalog: picture-symbol metadata and lookups.
//!
//! The catalog is read-only at runtime. A JSON file can replace the
//! built-in set; anything that fails to load falls back to the built-ins
//! so the board always has symbols to show.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A pictogram representing an activity or object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    pub id: String,
    pub filename: String,
    pub display_name: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

pub const CATEGORY_MORNING: &str = "Morning Routine";
pub const CATEGORY_MEALTIME: &str = "Mealtime";
pub const CATEGORY_BEDTIME: &str = "Bedtime";
pub const CATEGORY_ACTIVITIES: &str = "Activities";

pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    /// Load a catalog from a JSON file, or the built-in set when the path
    /// is empty or unreadable.
    pub fn load(path: &str) -> Self {
        if path.is_empty() {
            return Self::builtin();
        }

        match std::fs::read_to_string(Path::new(path)) {
            Ok(contents) => match serde_json::from_str::<Vec<Symbol>>(&contents) {
                Ok(symbols) if !symbols.is_empty() => {
                    info!("Loaded {} symbols from {path}", symbols.len());
                    Self { symbols }
                }
                Ok(_) => {
                    warn!("Symbol catalog {path} is empty, using built-in set");
                    Self::builtin()
                }
                Err(e) => {
                    warn!("Failed to parse symbol catalog {path}: {e}, using built-in set");
                    Self::builtin()
                }
            },
            Err(e) => {
                warn!("Failed to read symbol catalog {path}: {e}, using built-in set");
                Self::builtin()
            }
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    pub fn by_filename(&self, filename: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.filename == filename)
    }

    pub fn in_category(&self, category: &str) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.categories.iter().any(|c| c == category))
            .collect()
    }

    /// All category names, sorted and deduplicated.
    pub fn categories(&self) -> Vec<String> {
        self.symbols
            .iter()
            .flat_map(|s| s.categories.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.filename.clone()).collect()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// The symbol set shipped with the board.
    pub fn builtin() -> Self {
        fn sym(id: &str, filename: &str, display_name: &str, categories: &[&str]) -> Symbol {
            Symbol {
                id: id.into(),
                filename: filename.into(),
                display_name: display_name.into(),
                categories: categories.iter().map(|c| (*c).into()).collect(),
            }
        }

        let symbols = vec![
            // Morning routine
            sym("get-dressed", "get dressed.png", "Get Dressed", &[CATEGORY_MORNING]),
            sym(
                "get-dressed-school",
                "get dressed for school.png",
                "Get Dressed for School",
                &[CATEGORY_MORNING],
            ),
            sym(
                "brush-teeth",
                "brush teeth girl.png",
                "Brush Teeth",
                &[CATEGORY_MORNING, CATEGORY_BEDTIME],
            ),
            sym("brush-hair", "brush hair.png", "Brush Hair", &[CATEGORY_MORNING]),
            sym(
                "toilet",
                "toilet.png",
                "Toilet",
                &[CATEGORY_MORNING, CATEGORY_MEALTIME, CATEGORY_BEDTIME, CATEGORY_ACTIVITIES],
            ),
            // Mealtime
            sym("cheese-toast", "cheese on toast.png", "Cheese on Toast", &[CATEGORY_MEALTIME]),
            sym("dinner-time", "dinner time.png", "Dinner Time", &[CATEGORY_MEALTIME]),
            sym("dinner", "dinner.png", "Dinner", &[CATEGORY_MEALTIME]),
            sym(
                "bottle",
                "bottle.png",
                "Bottle",
                &[CATEGORY_MORNING, CATEGORY_MEALTIME, CATEGORY_BEDTIME, CATEGORY_ACTIVITIES],
            ),
            // Bedtime
            sym("bath", "bath.png", "Bath", &[CATEGORY_BEDTIME]),
            sym("pyjamas", "pyjamas.png", "Pyjamas", &[CATEGORY_BEDTIME]),
            sym("bedtime-song", "bedtime song.png", "Bedtime Song", &[CATEGORY_BEDTIME]),
            sym(
                "bedtime-song-bunk",
                "bedtime song bunk beds.png",
                "Bedtime Song (Bunk Beds)",
                &[CATEGORY_BEDTIME],
            ),
            sym("bunk-beds", "bunk beds.png", "Bunk Beds", &[CATEGORY_BEDTIME]),
            sym("sleep", "sleep.png", "Sleep", &[CATEGORY_BEDTIME]),
            sym(
                "sleep-bunk-beds",
                "sleep in bunk beds.png",
                "Sleep in Bunk Beds",
                &[CATEGORY_BEDTIME],
            ),
            sym("dream-machine", "dream machine.png", "Dream Machine", &[CATEGORY_BEDTIME]),
            // Activities
            sym("car", "car.png", "Car", &[CATEGORY_ACTIVITIES]),
            sym("train", "train.png", "Train", &[CATEGORY_ACTIVITIES]),
            sym(
                "pushchair",
                "pushchair.png",
                "Pushchair",
                &[CATEGORY_ACTIVITIES, CATEGORY_MORNING],
            ),
            sym("ipad", "ipad.png", "iPad", &[CATEGORY_ACTIVITIES]),
            sym("ice-lolly", "ice lolly.png", "Ice Lolly", &[CATEGORY_ACTIVITIES]),
            sym("easter-egg", "easter egg.png", "Easter Egg", &[CATEGORY_ACTIVITIES]),
            sym("chloe", "Chloe.png", "Chloe", &[CATEGORY_ACTIVITIES]),
            sym("finished", "finished.png", "Finished", &[CATEGORY_ACTIVITIES]),
        ];

        Self { symbols }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        let catalog = SymbolCatalog::builtin();
        let symbol = catalog.by_id("toilet").unwrap();
        assert_eq!(symbol.filename, "toilet.png");
        assert_eq!(symbol.display_name, "Toilet");
    }

    #[test]
    fn test_lookup_by_filename() {
        let catalog = SymbolCatalog::builtin();
        let symbol = catalog.by_filename("brush teeth girl.png").unwrap();
        assert_eq!(symbol.id, "brush-teeth");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let catalog = SymbolCatalog::builtin();
        assert!(catalog.by_id("no-such-symbol").is_none());
        assert!(catalog.by_filename("no-such-file.png").is_none());
    }

    #[test]
    fn test_category_filter() {
        let catalog = SymbolCatalog::builtin();
        let mealtime = catalog.in_category(CATEGORY_MEALTIME);
        assert!(mealtime.iter().any(|s| s.id == "dinner"));
        assert!(mealtime.iter().all(|s| s.categories.iter().any(|c| c == CATEGORY_MEALTIME)));
        assert!(catalog.in_category("No Such Category").is_empty());
    }

    #[test]
    fn test_categories_sorted_and_deduplicated() {
        let catalog = SymbolCatalog::builtin();
        let categories = catalog.categories();
        assert_eq!(
            categories,
            vec![
                CATEGORY_ACTIVITIES.to_string(),
                CATEGORY_BEDTIME.to_string(),
                CATEGORY_MEALTIME.to_string(),
                CATEGORY_MORNING.to_string(),
            ]
        );
    }

    #[test]
    fn test_load_missing_file_falls_back_to_builtin() {
        let catalog = SymbolCatalog::load("/nonexistent/symbols.json");
        assert_eq!(catalog.len(), SymbolCatalog::builtin().len());
    }
}
