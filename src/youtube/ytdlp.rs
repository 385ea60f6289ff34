use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use url::Url;

use super::{CaptionClient, CaptionKind, CaptionSegment, CaptionTrack, FetchError, VideoMetadata};
use crate::utils::truncate_chars;

/// Caption document format requested from the platform
const CAPTION_FORMAT: &str = "json3";

/// Caption client backed by yt-dlp for metadata and track discovery, with
/// caption documents downloaded over HTTP
pub struct YtDlpClient {
    yt_dlp_path: String,
    http: Client,
    last_info: Mutex<Option<(String, Arc<Value>)>>,
}

impl YtDlpClient {
    pub fn new() -> Self {
        Self::with_path("yt-dlp")
    }

    pub fn with_path(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            http: Client::new(),
            last_info: Mutex::new(None),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Video info JSON, reusing the previous dump when the same video is asked for
    /// twice in a row (metadata then track listing)
    async fn video_info(&self, video_id: &str) -> Result<Arc<Value>, FetchError> {
        if let Some(info) = self.cached_info(video_id) {
            return Ok(info);
        }

        let info = Arc::new(self.dump_info(video_id).await?);
        if let Ok(mut last) = self.last_info.lock() {
            *last = Some((video_id.to_string(), info.clone()));
        }
        Ok(info)
    }

    fn cached_info(&self, video_id: &str) -> Option<Arc<Value>> {
        let last = self.last_info.lock().ok()?;
        match last.as_ref() {
            Some((id, info)) if id == video_id => Some(info.clone()),
            _ => None,
        }
    }

    async fn dump_info(&self, video_id: &str) -> Result<Value, FetchError> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                &url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| FetchError::Client(format!("failed to run {}: {}", self.yt_dlp_path, err)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_error(&stderr));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| FetchError::Client(format!("invalid yt-dlp output: {}", err)))
    }
}

impl Default for YtDlpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionClient for YtDlpClient {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, FetchError> {
        let info = self.video_info(video_id).await?;
        Ok(parse_metadata(&info, video_id))
    }

    async fn fetch_caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, FetchError> {
        let info = self.video_info(video_id).await?;
        Ok(parse_caption_tracks(&info))
    }

    async fn fetch_caption(
        &self,
        video_id: &str,
        track: &CaptionTrack,
    ) -> Result<Vec<CaptionSegment>, FetchError> {
        let url = track.url.as_deref().ok_or_else(|| {
            FetchError::Client(format!(
                "caption track {} for {} has no download URL",
                track.language, video_id
            ))
        })?;

        tracing::debug!("Downloading {} captions for {}", track.language, video_id);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Client(format!("caption download failed: {}", err)))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            StatusCode::NOT_FOUND => return Err(FetchError::TranscriptUnavailable),
            status if !status.is_success() => {
                return Err(FetchError::Client(format!("caption download failed: HTTP {}", status)))
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Client(format!("failed to read caption body: {}", err)))?;

        parse_json3_captions(&body)
    }
}

fn parse_metadata(info: &Value, video_id: &str) -> VideoMetadata {
    let author = info["uploader"]
        .as_str()
        .or_else(|| info["channel"].as_str())
        .unwrap_or_default();

    VideoMetadata {
        id: info["id"].as_str().unwrap_or(video_id).to_string(),
        title: info["title"].as_str().unwrap_or_default().to_string(),
        author: author.to_string(),
        duration_seconds: info["duration"].as_f64().map(|d| d.max(0.0) as u64).unwrap_or(0),
    }
}

/// Collect manual (`subtitles`) and speech-recognition (`automatic_captions`)
/// tracks that offer a json3 download
fn parse_caption_tracks(info: &Value) -> Vec<CaptionTrack> {
    let mut tracks = Vec::new();

    for (section, kind) in [
        ("subtitles", CaptionKind::Manual),
        ("automatic_captions", CaptionKind::AutoGenerated),
    ] {
        let Some(languages) = info[section].as_object() else {
            continue;
        };

        for (language, formats) in languages {
            if language == "live_chat" {
                continue;
            }
            let Some(formats) = formats.as_array() else {
                continue;
            };

            let download = formats
                .iter()
                .filter(|format| format["ext"].as_str() == Some(CAPTION_FORMAT))
                .filter_map(|format| format["url"].as_str())
                .find(|url| !is_machine_translated(url));

            if let Some(url) = download {
                let mut track = CaptionTrack::new(language.clone(), kind).with_url(url);
                track.name = formats
                    .first()
                    .and_then(|format| format["name"].as_str())
                    .map(str::to_string);
                tracks.push(track);
            }
        }
    }

    tracks
}

/// Caption URLs asking the platform to translate into another language carry `tlang`
fn is_machine_translated(caption_url: &str) -> bool {
    Url::parse(caption_url)
        .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "tlang"))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: i64,
    #[serde(default)]
    d_duration_ms: i64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

fn parse_json3_captions(body: &str) -> Result<Vec<CaptionSegment>, FetchError> {
    let document: Json3Document = serde_json::from_str(body)
        .map_err(|err| FetchError::Client(format!("invalid caption document: {}", err)))?;

    let segments = document
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            (!text.is_empty()).then(|| CaptionSegment::new(event.t_start_ms, event.d_duration_ms, text))
        })
        .collect();

    Ok(segments)
}

/// Map yt-dlp's stderr onto the platform failure kinds
fn classify_ytdlp_error(stderr: &str) -> FetchError {
    let lower = stderr.to_lowercase();

    if lower.contains("private video") {
        return FetchError::VideoPrivate;
    }

    if lower.contains("confirm your age") || lower.contains("age-restricted") || lower.contains("age restricted") {
        return FetchError::AgeRestricted;
    }

    if lower.contains("http error 429") || lower.contains("too many requests") {
        return FetchError::RateLimited;
    }

    if lower.contains("video unavailable")
        || lower.contains("is not available")
        || lower.contains("does not exist")
        || lower.contains("incomplete youtube id")
    {
        let reason = stderr.lines().find(|line| !line.trim().is_empty()).unwrap_or("video unavailable");
        return FetchError::VideoNotFound(reason.trim().to_string());
    }

    FetchError::Client(format!("yt-dlp failed: {}", truncate_chars(stderr.trim(), 300)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::select_caption_candidates;
    use serde_json::json;

    #[test]
    fn test_parse_metadata() {
        let info = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "channel": "Rick Astley",
            "duration": 212.0
        });

        let metadata = parse_metadata(&info, "ignored");
        assert_eq!(metadata.id, "dQw4w9WgXcQ");
        assert_eq!(metadata.author, "Rick Astley");
        assert_eq!(metadata.duration_seconds, 212);
    }

    #[test]
    fn test_parse_caption_tracks_reads_both_sections() {
        let info = json!({
            "subtitles": {
                "en": [
                    {"ext": "vtt", "url": "https://example.test/en.vtt", "name": "English"},
                    {"ext": "json3", "url": "https://example.test/en.json3", "name": "English"}
                ],
                "live_chat": [{"ext": "json3", "url": "https://example.test/chat"}]
            },
            "automatic_captions": {
                "es": [{"ext": "json3", "url": "https://example.test/es.json3"}],
                "fr": [{"ext": "srv1", "url": "https://example.test/fr.srv1"}]
            }
        });

        let tracks = parse_caption_tracks(&info);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language, "en");
        assert_eq!(tracks[0].kind, CaptionKind::Manual);
        assert_eq!(tracks[0].url.as_deref(), Some("https://example.test/en.json3"));
        assert_eq!(tracks[0].name.as_deref(), Some("English"));
        assert_eq!(tracks[1].language, "es");
        assert_eq!(tracks[1].kind, CaptionKind::AutoGenerated);
    }

    #[test]
    fn test_translated_automatic_captions_are_skipped() {
        let info = json!({
            "automatic_captions": {
                "en": [{"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr&fmt=json3"}],
                "de": [{"ext": "json3", "url": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr&fmt=json3&tlang=de"}]
            }
        });

        let tracks = parse_caption_tracks(&info);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language, "en");

        let candidates = select_caption_candidates(&tracks, "de");
        assert_eq!(candidates[0].language, "en");
        assert!(!candidates[0].url.as_deref().unwrap_or_default().contains("tlang"));
    }

    #[test]
    fn test_parse_caption_tracks_without_captions() {
        assert!(parse_caption_tracks(&json!({"id": "x"})).is_empty());
    }

    #[test]
    fn test_parse_json3_captions() {
        let body = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 1000, "segs": [{"utf8": "Hello"}, {"utf8": " there"}]},
                {"tStartMs": 1000, "dDurationMs": 10},
                {"tStartMs": 1010, "dDurationMs": 5, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 1500, "dDurationMs": 1500, "segs": [{"utf8": "General\nKenobi"}]}
            ]
        }"#;

        let segments = parse_json3_captions(body).unwrap();
        assert_eq!(
            segments,
            vec![
                CaptionSegment::new(0, 1000, "Hello there"),
                CaptionSegment::new(1500, 1500, "General Kenobi"),
            ]
        );
    }

    #[test]
    fn test_parse_json3_rejects_garbage() {
        assert!(matches!(parse_json3_captions("<xml/>"), Err(FetchError::Client(_))));
    }

    #[test]
    fn test_classify_ytdlp_error() {
        assert_eq!(
            classify_ytdlp_error("ERROR: [youtube] abc: Private video. Sign in if you've been granted access"),
            FetchError::VideoPrivate
        );
        assert_eq!(
            classify_ytdlp_error("ERROR: [youtube] abc: Sign in to confirm your age."),
            FetchError::AgeRestricted
        );
        assert_eq!(
            classify_ytdlp_error("ERROR: Unable to download webpage: HTTP Error 429: Too Many Requests"),
            FetchError::RateLimited
        );
        assert!(matches!(
            classify_ytdlp_error("ERROR: [youtube] abc: Video unavailable"),
            FetchError::VideoNotFound(_)
        ));
        assert!(matches!(classify_ytdlp_error("something else"), FetchError::Client(_)));
    }
}
