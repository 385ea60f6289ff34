use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static VIDEO_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));

const SHORT_LINK_HOST: &str = "youtu.be";
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", SHORT_LINK_HOST];

/// Reasons a user-supplied video reference could not be resolved
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("video URL is required")]
    Required,

    #[error("invalid video URL: {0}")]
    InvalidFormat(String),

    #[error("failed to extract video ID from URL: {0}")]
    IdExtractionFailed(String),
}

/// Check whether `candidate` has the exact shape of a canonical video ID
pub fn is_video_id(candidate: &str) -> bool {
    VIDEO_ID_PATTERN.is_match(candidate)
}

/// Resolve a bare ID or any recognised YouTube URL into the canonical 11 character ID.
///
/// Accepted forms include `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/`, `/v/` and
/// `/live/` links, with or without a scheme.
pub fn resolve_video_id(input: &str) -> Result<String, ResolveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::Required);
    }

    if is_video_id(trimmed) {
        return Ok(trimmed.to_string());
    }

    let parsed = parse_with_fallback(trimmed)?;
    let host = parsed
        .host_str()
        .map(|h| h.trim().to_lowercase())
        .unwrap_or_default();

    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(ResolveError::InvalidFormat(format!(
            "{} is not a YouTube URL",
            trimmed
        )));
    }

    let candidate = extract_candidate(&parsed, &host)
        .ok_or_else(|| ResolveError::IdExtractionFailed(trimmed.to_string()))?;

    if !is_video_id(&candidate) {
        return Err(ResolveError::IdExtractionFailed(format!(
            "{} (invalid video ID format)",
            trimmed
        )));
    }

    Ok(candidate)
}

/// Parse as-is first; inputs such as `youtube.com/watch?v=..` carry no scheme
/// and only yield a host once `https://` is prefixed.
fn parse_with_fallback(input: &str) -> Result<Url, ResolveError> {
    if let Ok(url) = Url::parse(input) {
        if url.host_str().map_or(false, |host| !host.is_empty()) {
            return Ok(url);
        }
    }

    Url::parse(&format!("https://{}", input))
        .map_err(|err| ResolveError::InvalidFormat(format!("{}: {}", input, err)))
}

fn extract_candidate(url: &Url, host: &str) -> Option<String> {
    if host == SHORT_LINK_HOST {
        let path = url.path().trim().trim_matches('/');
        return (!path.is_empty()).then(|| path.to_string());
    }

    if let Some((_, id)) = url.query_pairs().find(|(key, value)| key == "v" && !value.is_empty()) {
        return Some(id.into_owned());
    }

    url.path()
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
