//! Sequence model: ordered, named lists of symbol steps.
//!
//! Presets are fixed at startup; user sequences are created through the
//! editor flow in `store`. Identity generation is kept as pure functions
//! so the disambiguation rules are testable without any storage.

use serde::{Deserialize, Serialize};

/// Reserved terminal step appended to every saved sequence.
pub const FINISHED_ID: &str = "finished";

/// An ordered, named list of symbol references representing a routine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sequence {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub symbol_ids: Vec<String>,
    /// Local timestamp of the last save. Presets carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, name: impl Into<String>, symbol_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            symbol_ids,
            saved_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.symbol_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_ids.is_empty()
    }

    /// Strip every "finished" step and append exactly one at the end.
    /// Idempotent: normalizing twice yields the same list.
    pub fn normalize_finished(&mut self) {
        self.symbol_ids.retain(|id| id != FINISHED_ID);
        self.symbol_ids.push(FINISHED_ID.to_string());
    }
}

/// The routines shipped with the board.
pub fn presets() -> Vec<Sequence> {
    fn seq(id: &str, name: &str, description: &str, symbol_ids: &[&str]) -> Sequence {
        Sequence {
            id: id.into(),
            name: name.into(),
            description: Some(description.into()),
            symbol_ids: symbol_ids.iter().map(|s| (*s).into()).collect(),
            saved_at: None,
        }
    }

    vec![
        seq(
            "bedtime-routine",
            "Bedtime Routine",
            "Evening routine to prepare for sleep",
            &[
                "dinner",
                "toilet",
                "bath",
                "pyjamas",
                "ipad",
                "brush-teeth",
                "bedtime-song",
                "dream-machine",
                "sleep",
                "finished",
            ],
        ),
        seq(
            "morning-routine",
            "Morning Routine",
            "Morning preparation routine",
            &[
                "toilet",
                "brush-teeth",
                "brush-hair",
                "get-dressed",
                "bottle",
                "pushchair",
                "finished",
            ],
        ),
        seq(
            "mealtime-routine",
            "Mealtime",
            "Typical meal routine",
            &["dinner-time", "cheese-toast", "toilet", "bottle", "finished"],
        ),
    ]
}

/// Lowercased, hyphen-joined form of a display name.
fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Generate a sequence id from a display name, disambiguating against
/// existing ids with a `-1`, `-2`, … counter loop.
pub fn unique_sequence_id(name: &str, existing_ids: &[String]) -> String {
    let base = slugify(name);
    let mut candidate = base.clone();
    let mut counter = 1;

    while existing_ids.iter().any(|id| *id == candidate) {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }

    candidate
}

/// Disambiguate a display name against existing names with the `_001`,
/// `_002`, … suffix rule. Returns the base unchanged when it is free.
pub fn disambiguate_name(base: &str, existing_names: &[String]) -> String {
    if !existing_names.iter().any(|n| n == base) {
        return base.to_string();
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter:03}");
        if !existing_names.iter().any(|n| *n == candidate) {
            return candidate;
        }
        counter += 1;
    }
}
