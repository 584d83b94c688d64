//! Speech/audio playback gateway.
//!
//! Two mechanisms, selected by deployment config and never mixed:
//! - `clips`: pre-rendered audio assets looked up by display-name slug
//!   with a lowercase fallback retry
//! - `synth`: live speech synthesis with heuristic voice selection
//!
//! `gateway` owns the serial playback queue so at most one utterance or
//! clip plays at a time.

pub mod clips;
pub mod gateway;
pub mod synth;
