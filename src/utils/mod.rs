use chrono::{DateTime, Local, Utc};
use url::Url;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Local date and time for display
pub fn format_local_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Local date only, for list views
pub fn format_local_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Check whether a confirmation answer means yes
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
