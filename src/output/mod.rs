use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

use crate::ai::ExtractionItem;
use crate::cli::OutputFormat;
use crate::enrich::AiAnswer;
use crate::storage::{AiExtraction, AiSummary, Transcript, TranscriptSegment, Video};
use crate::transcripts::FetchedTranscript;
use crate::utils::{format_duration, format_offset_ms, truncate_chars};

const PREVIEW_CHARS: usize = 160;

/// A stored transcript together with its video and cached enrichments
#[derive(Debug, Serialize)]
pub struct TranscriptView<'a> {
    pub video: &'a Video,
    pub transcript: &'a Transcript,
    pub summaries: &'a [AiSummary],
    pub extractions: &'a [AiExtraction],
}

pub fn render_fetched(fetched: &FetchedTranscript, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return as_json(fetched);
    }

    let mut out = String::new();
    write_video_header(&mut out, &fetched.video);
    writeln!(
        out,
        "Transcript: {} (language {}, {} track {})",
        fetched.transcript.id,
        fetched.transcript.language,
        fetched.track.kind.as_str(),
        fetched.track.language
    )?;
    writeln!(out)?;
    write_segments(&mut out, &fetched.transcript.segments);
    Ok(out)
}

pub fn render_summary(summary: &AiSummary, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return as_json(summary);
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} summary ({}, {} tokens)",
        summary.kind, summary.model, summary.tokens_used
    )?;
    writeln!(out)?;
    if !summary.content.text.is_empty() {
        writeln!(out, "{}", summary.content.text)?;
    }

    if !summary.content.key_points.is_empty() {
        writeln!(out)?;
        for point in &summary.content.key_points {
            writeln!(out, "  • {}", point)?;
        }
    }

    for section in &summary.content.sections {
        writeln!(out)?;
        writeln!(out, "## {}", section.title)?;
        writeln!(out, "{}", section.content)?;
    }

    Ok(out)
}

pub fn render_extraction(extraction: &AiExtraction, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return as_json(extraction);
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} extraction ({}, {} tokens): {} item(s)",
        extraction.kind,
        extraction.model,
        extraction.tokens_used,
        extraction.content.items.len()
    )?;

    for (index, item) in extraction.content.items.iter().enumerate() {
        writeln!(out)?;
        write_item(&mut out, index + 1, item);
    }

    Ok(out)
}

pub fn render_answer(answer: &AiAnswer, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return as_json(answer);
    }

    let mut out = String::new();
    writeln!(out, "Q: {}", answer.question)?;
    if answer.not_found {
        writeln!(out, "A: {} (not found in transcript)", answer.answer)?;
    } else {
        writeln!(out, "A: {}", answer.answer)?;
    }
    writeln!(out, "Confidence: {}", answer.confidence.as_str())?;

    if !answer.sources.is_empty() {
        writeln!(out, "Sources:")?;
        for source in &answer.sources {
            writeln!(out, "  > {}", source)?;
        }
    }

    Ok(out)
}

pub fn render_view(view: &TranscriptView<'_>, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return as_json(view);
    }

    let mut out = String::new();
    write_video_header(&mut out, view.video);
    writeln!(
        out,
        "Transcript: {} (language {}, stored {})",
        view.transcript.id,
        view.transcript.language,
        view.transcript.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    if !view.summaries.is_empty() {
        writeln!(out)?;
        writeln!(out, "Summaries:")?;
        for summary in view.summaries {
            writeln!(
                out,
                "  [{}] {}: {}",
                summary.id,
                summary.kind,
                truncate_chars(&summary.content.text, PREVIEW_CHARS)
            )?;
        }
    }

    if !view.extractions.is_empty() {
        writeln!(out)?;
        writeln!(out, "Extractions:")?;
        for extraction in view.extractions {
            writeln!(
                out,
                "  [{}] {}: {} item(s)",
                extraction.id,
                extraction.kind,
                extraction.content.items.len()
            )?;
        }
    }

    writeln!(out)?;
    write_segments(&mut out, &view.transcript.segments);
    Ok(out)
}

fn as_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn write_video_header(out: &mut String, video: &Video) {
    let duration = u64::try_from(video.duration_seconds).unwrap_or_default();
    let _ = writeln!(out, "Video: {} [{}]", video.title, video.youtube_id);
    let _ = writeln!(out, "Channel: {}", video.channel);
    let _ = writeln!(out, "Duration: {}", format_duration(duration));
}

fn write_segments(out: &mut String, segments: &[TranscriptSegment]) {
    for segment in segments {
        let _ = writeln!(out, "[{}] {}", format_offset_ms(segment.start_ms), segment.text);
    }
}

fn write_item(out: &mut String, number: usize, item: &ExtractionItem) {
    let _ = writeln!(out, "{}.", number);
    for (field, value) in item {
        let rendered = match value {
            Value::String(text) => text.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        let _ = writeln!(out, "   {}: {}", field, rendered);
    }
}
