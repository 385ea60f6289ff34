pub mod deadline;

pub use deadline::{Interrupted, RequestContext};

/// Format duration in human-readable format
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a millisecond offset as `mm:ss` or `h:mm:ss`
pub fn format_offset_ms(offset_ms: i64) -> String {
    let total_seconds = offset_ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Normalize a language code for comparisons: trimmed and lower-cased
pub fn normalize_language_code(lang: &str) -> String {
    lang.trim().to_lowercase()
}

/// Truncate text to at most `max_chars` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
    }

    #[test]
    fn test_format_offset_ms() {
        assert_eq!(format_offset_ms(0), "00:00");
        assert_eq!(format_offset_ms(61_500), "01:01");
        assert_eq!(format_offset_ms(3_723_000), "1:02:03");
        assert_eq!(format_offset_ms(-5), "00:00");
    }

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code(" EN "), "en");
        assert_eq!(normalize_language_code("pt-BR"), "pt-br");
        assert_eq!(normalize_language_code(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
    }
}
