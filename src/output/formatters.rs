use anyhow::{Context, Result};

use crate::controller::DisplayedExtraction;
use crate::history::HistoryRecord;
use crate::platforms;
use crate::utils::{extract_domain, format_duration, format_local_date, format_local_timestamp};

pub const EMPTY_TEXT_PLACEHOLDER: &str = "No text could be extracted from this video.";
pub const EMPTY_HISTORY: &str = "No transcriptions yet";

/// Format an extraction as plain text
pub fn format_as_text(displayed: &DisplayedExtraction) -> String {
    let result = &displayed.result;
    let mut lines = vec![
        format!("Title: {}", result.title),
        format!("Detected language: {}", result.language),
        format!("Extracted at: {}", format_local_timestamp(&result.retrieved_at)),
    ];

    let source = match (platforms::platform_for(&displayed.url), extract_domain(&displayed.url)) {
        (Some(platform), Some(domain)) => format!("{} ({})", platform.name, domain),
        (None, Some(domain)) => domain,
        _ => displayed.url.clone(),
    };
    lines.push(format!("Source: {}", source));

    if let Some(duration) = result.duration_secs {
        lines.push(format!("Duration: {}", format_duration(duration)));
    }

    if let Some(summary) = &result.summary {
        lines.push(String::new());
        lines.push("Summary:".to_string());
        lines.push(summary.clone());
    }

    lines.push(String::new());
    if result.text.is_empty() {
        lines.push(EMPTY_TEXT_PLACEHOLDER.to_string());
    } else {
        lines.push(result.text.clone());
    }

    lines.join("\n")
}

/// Format an extraction as pretty JSON
pub fn format_as_json(displayed: &DisplayedExtraction) -> Result<String> {
    serde_json::to_string_pretty(displayed).context("Failed to serialize extraction")
}

/// Format the history list as plain text
pub fn format_history_as_text(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    records
        .iter()
        .map(|record| {
            format!(
                "[{}] {}\n    {} | {}\n    {}",
                record.id,
                record.title,
                record.language,
                format_local_date(&record.timestamp),
                record.preview
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format the history list as pretty JSON
pub fn format_history_as_json(records: &[HistoryRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize history")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{DisplayOutcome, ExtractionResult};
    use chrono::Utc;

    fn displayed(text: &str) -> DisplayedExtraction {
        DisplayedExtraction {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            result: ExtractionResult {
                text: text.to_string(),
                language: "en".to_string(),
                title: "Demo".to_string(),
                retrieved_at: Utc::now(),
                summary: None,
                duration_secs: Some(95.0),
            },
            outcome: DisplayOutcome::Succeeded,
        }
    }

    #[test]
    fn test_text_format() {
        let text = format_as_text(&displayed("hello world"));
        assert!(text.contains("Title: Demo"));
        assert!(text.contains("Detected language: en"));
        assert!(text.contains("Source: YouTube (youtube.com)"));
        assert!(text.contains("Duration: 1m 35s"));
        assert!(text.ends_with("hello world"));
        assert!(!text.contains("Summary:"));
    }

    #[test]
    fn test_empty_text_uses_placeholder() {
        let text = format_as_text(&displayed(""));
        assert!(text.ends_with(EMPTY_TEXT_PLACEHOLDER));
    }

    #[test]
    fn test_summary_is_shown_when_present() {
        let mut value = displayed("hello");
        value.result.summary = Some("Short recap".to_string());
        assert!(format_as_text(&value).contains("Summary:\nShort recap"));
    }

    #[test]
    fn test_json_format() {
        let json = format_as_json(&displayed("hello world")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result"]["text"], "hello world");
        assert_eq!(value["outcome"], "succeeded");
        assert!(value["result"].get("summary").is_none());
    }

    #[test]
    fn test_history_text_format() {
        assert_eq!(format_history_as_text(&[]), EMPTY_HISTORY);

        let record = HistoryRecord::new(
            "42".to_string(),
            "https://youtu.be/a",
            &displayed("hello world").result,
            Utc::now(),
        );
        let text = format_history_as_text(&[record]);
        assert!(text.starts_with("[42] Demo"));
        assert!(text.contains("hello world..."));
    }
}
