//! Pre-rendered clip lookup: display name → candidate audio paths.
//!
//! The first candidate preserves the display name's case so proper nouns
//! ("Chloe") hit their exact-case asset; the single retry forces
//! lowercase. Both candidates live under the audio root as
//! `<slug>.<ext>`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::catalog::SymbolCatalog;

/// Derive the audio asset slug for a display name: punctuation stripped
/// (underscore survives), whitespace runs collapsed to a single
/// underscore, case preserved.
pub fn audio_slug(display_name: &str) -> String {
    let cleaned: String = display_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Candidate paths for a display name, in attempt order. The lowercase
/// variant is included only when it differs from the first attempt.
pub fn candidates(audio_root: &Path, display_name: &str, extension: &str) -> Vec<PathBuf> {
    let slug = audio_slug(display_name);
    if slug.is_empty() {
        return Vec::new();
    }

    let mut paths = vec![audio_root.join(format!("{slug}.{extension}"))];
    let lower = slug.to_lowercase();
    if lower != slug {
        paths.push(audio_root.join(format!("{lower}.{extension}")));
    }
    paths
}

/// Result of the asset-preload sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub present: usize,
    pub missing: Vec<String>,
}

/// Check which catalog symbols have an audio asset on disk. Per-item and
/// fail-soft: missing assets are counted, the sweep never aborts.
pub fn sweep(audio_root: &Path, extension: &str, catalog: &SymbolCatalog) -> SweepReport {
    let mut report = SweepReport::default();

    for symbol in catalog.symbols() {
        let found = candidates(audio_root, &symbol.display_name, extension)
            .iter()
            .any(|p| p.exists());
        if found {
            report.present += 1;
        } else {
            debug!("No audio asset for \"{}\"", symbol.display_name);
            report.missing.push(symbol.display_name.clone());
        }
    }

    info!(
        "Audio asset sweep: {}/{} present, {} missing",
        report.present,
        catalog.len(),
        report.missing.len()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_collapses_whitespace_to_underscores() {
        assert_eq!(audio_slug("Brush  Teeth"), "Brush_Teeth");
        assert_eq!(audio_slug("  get dressed for school "), "get_dressed_for_school");
    }

    #[test]
    fn test_slug_strips_punctuation_but_keeps_underscore() {
        assert_eq!(audio_slug("Bedtime Song (Bunk Beds)"), "Bedtime_Song_Bunk_Beds");
        assert_eq!(audio_slug("already_slugged"), "already_slugged");
        assert_eq!(audio_slug("McDonald's"), "McDonald_s");
    }

    #[test]
    fn test_slug_preserves_case() {
        assert_eq!(audio_slug("Chloe"), "Chloe");
    }

    #[test]
    fn test_candidates_include_lowercase_fallback_only_when_different() {
        let root = Path::new("/audio");
        let paths = candidates(root, "Chloe", "mp3");
        assert_eq!(paths, vec![PathBuf::from("/audio/Chloe.mp3"), PathBuf::from("/audio/chloe.mp3")]);

        let paths = candidates(root, "toilet", "mp3");
        assert_eq!(paths, vec![PathBuf::from("/audio/toilet.mp3")]);
    }

    #[test]
    fn test_candidates_empty_name() {
        assert!(candidates(Path::new("/audio"), "   ", "mp3").is_empty());
    }

    #[test]
    fn test_sweep_counts_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Toilet.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("bath.mp3"), b"x").unwrap();

        let catalog = SymbolCatalog::builtin();
        let report = sweep(dir.path(), "mp3", &catalog);
        assert_eq!(report.present, 2);
        assert_eq!(report.present + report.missing.len(), catalog.len());
    }
}
