//! Sequence playback engine.
//!
//! A state machine over the transient playback cursor:
//!
//! Idle → (select non-empty sequence) → Active { sequence, step: 0 }
//! Active → stepForward/stepBackward (clamped, no wraparound) → Active
//! Active → deselect / unresolvable select → Idle
//!
//! Display convention: two slots, "now" = `symbol_ids[step]` and
//! "next" = `symbol_ids[step + 1]`; "next" is empty on the last step.
//! A step whose symbol id no longer resolves renders as an empty slot —
//! navigation keeps operating on the index regardless.

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::SymbolCatalog;
use crate::store::SequenceStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    Idle,
    Active { sequence_id: String, step: usize },
}

/// A resolved display slot. `None` fields mean "placeholder": either no
/// step exists for the slot, or the step's symbol id is unknown.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DisplaySlot {
    pub symbol_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// What the board should currently show.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct BoardDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
    pub step_index: usize,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<DisplaySlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<DisplaySlot>,
}

pub struct PlaybackEngine {
    state: CursorState,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self { state: CursorState::Idle }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn selected_sequence_id(&self) -> Option<&str> {
        match &self.state {
            CursorState::Active { sequence_id, .. } => Some(sequence_id),
            CursorState::Idle => None,
        }
    }

    pub fn current_step_index(&self) -> Option<usize> {
        match &self.state {
            CursorState::Active { step, .. } => Some(*step),
            CursorState::Idle => None,
        }
    }

    /// Select a sequence and reset the cursor to its first step. An id
    /// that does not resolve to a non-empty sequence lands in Idle.
    pub fn select_sequence(&mut self, store: &SequenceStore, id: &str) {
        match store.get(id) {
            Some(sequence) if !sequence.is_empty() => {
                info!("Selected sequence {id} at step 0");
                self.state = CursorState::Active {
                    sequence_id: id.to_string(),
                    step: 0,
                };
            }
            _ => {
                debug!("Sequence {id} not selectable, cursor idle");
                self.state = CursorState::Idle;
            }
        }
    }

    /// Re-enter a persisted cursor position, clamping the step into the
    /// sequence's current range. A stale sequence id stays Idle.
    pub fn restore(&mut self, store: &SequenceStore, id: &str, step: usize) {
        self.select_sequence(store, id);
        if let CursorState::Active { sequence_id, step: current } = &mut self.state {
            let len = store.get(sequence_id).map(|s| s.len()).unwrap_or(0);
            *current = step.min(len.saturating_sub(1));
        }
    }

    /// Advance one step. No-op at the terminal boundary and in Idle.
    /// Returns whether the cursor moved.
    pub fn step_forward(&mut self, store: &SequenceStore) -> bool {
        if let CursorState::Active { sequence_id, step } = &mut self.state {
            let len = store.get(sequence_id).map(|s| s.len()).unwrap_or(0);
            if *step + 1 < len {
                *step += 1;
                debug!("Step forward to {step}");
                return true;
            }
        }
        false
    }

    /// Go back one step. No-op at step 0 and in Idle. Returns whether the
    /// cursor moved.
    pub fn step_backward(&mut self, _store: &SequenceStore) -> bool {
        if let CursorState::Active { step, .. } = &mut self.state {
            if *step > 0 {
                *step -= 1;
                debug!("Step backward to {step}");
                return true;
            }
        }
        false
    }

    /// Clear the cursor. Sequence-driven display slots empty out.
    pub fn deselect(&mut self) {
        if self.state != CursorState::Idle {
            info!("Sequence deselected");
        }
        self.state = CursorState::Idle;
    }

    /// Resolve the current display: now/next slots for the active step.
    pub fn display(&self, store: &SequenceStore, catalog: &SymbolCatalog) -> BoardDisplay {
        let CursorState::Active { sequence_id, step } = &self.state else {
            return BoardDisplay::default();
        };

        let Some(sequence) = store.get(sequence_id) else {
            return BoardDisplay::default();
        };

        let slot = |index: usize| -> Option<DisplaySlot> {
            let symbol_id = sequence.symbol_ids.get(index)?;
            let resolved = catalog.by_id(symbol_id);
            Some(DisplaySlot {
                symbol_id: symbol_id.clone(),
                filename: resolved.map(|s| s.filename.clone()),
                display_name: resolved.map(|s| s.display_name.clone()),
            })
        };

        BoardDisplay {
            sequence_id: Some(sequence_id.clone()),
            step_index: *step,
            step_count: sequence.len(),
            now: slot(*step),
            next: slot(*step + 1),
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}
