/// Format a millimetre value for display, one decimal place
pub fn format_mm(value: Option<f64>) -> String {
    match value {
        Some(mm) => format!("{:.1} mm", mm),
        None => "N/A".to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an ISO 8601 date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}
