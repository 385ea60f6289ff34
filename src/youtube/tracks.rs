use std::collections::HashSet;

use super::{CaptionKind, CaptionTrack};
use crate::utils::normalize_language_code;

/// Language tried after the requested one
pub const DEFAULT_CAPTION_LANGUAGE: &str = "en";

/// Order the available caption tracks into the candidates to try, best first.
///
/// Preference: manual in the requested language, auto-generated in the requested
/// language, manual English, auto-generated English. Regional variants match
/// their base language (`en-GB` matches `en`). When nothing matches, every manual
/// track is returned in original order, and failing that every track, so the
/// result is only empty when `tracks` is.
pub fn select_caption_candidates(tracks: &[CaptionTrack], requested_language: &str) -> Vec<CaptionTrack> {
    let requested = normalize_language_code(requested_language);
    let fallback = normalize_language_code(DEFAULT_CAPTION_LANGUAGE);

    let passes = [
        (requested.as_str(), CaptionKind::Manual),
        (requested.as_str(), CaptionKind::AutoGenerated),
        (fallback.as_str(), CaptionKind::Manual),
        (fallback.as_str(), CaptionKind::AutoGenerated),
    ];

    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for (language, kind) in passes {
        if language.is_empty() {
            continue;
        }
        for track in tracks {
            if track.kind == kind && language_matches(&track.language, language) {
                push_unique(&mut ordered, &mut seen, track);
            }
        }
    }

    if ordered.is_empty() {
        for track in tracks.iter().filter(|t| t.kind == CaptionKind::Manual) {
            push_unique(&mut ordered, &mut seen, track);
        }
    }

    if ordered.is_empty() {
        for track in tracks {
            push_unique(&mut ordered, &mut seen, track);
        }
    }

    ordered
}

/// `code` matches `target` exactly or as a regional variant of it
pub fn language_matches(code: &str, target: &str) -> bool {
    let code = normalize_language_code(code);
    !target.is_empty() && (code == target || code.starts_with(&format!("{}-", target)))
}

fn push_unique(
    ordered: &mut Vec<CaptionTrack>,
    seen: &mut HashSet<(String, CaptionKind)>,
    track: &CaptionTrack,
) {
    if seen.insert((track.language.to_lowercase(), track.kind)) {
        ordered.push(track.clone());
    }
}
