// Logging utilities
// Structured logging with JSON and human-readable formats

use log::Level;
use serde_json::json;

/// Mask a secret for log output, keeping a short prefix and suffix of long values.
pub fn mask_sensitive(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    if input.chars().count() <= 8 {
        return "***".to_string();
    }

    let chars: Vec<char> = input.chars().collect();
    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", start, end)
}

/// Split the `[PHASE: ...]` and `[STEP: ...]` tags off a log message.
pub fn parse_log_metadata(message: &str) -> (Option<String>, Option<String>, String) {
    let (phase, rest) = take_tag(message, "[PHASE:");
    let (step, rest) = take_tag(&rest, "[STEP:");
    (phase, step, rest)
}

fn take_tag(message: &str, open: &str) -> (Option<String>, String) {
    let Some(start) = message.find(open) else {
        return (None, message.to_string());
    };
    let Some(len) = message[start..].find(']') else {
        return (None, message.to_string());
    };
    let value = message[start + open.len()..start + len].trim().to_string();
    let cleaned = format!("{} {}", &message[..start], &message[start + len + 1..])
        .trim()
        .to_string();
    (Some(value), cleaned)
}

/// Format log entry as one JSON line
pub fn format_json_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": message,
    });

    if let Some(phase) = phase {
        entry["phase"] = json!(phase);
    }
    if let Some(step) = step {
        entry["step"] = json!(step);
    }

    serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut line = format!("[{}] [{}]", timestamp, level.as_str());
    if let Some(phase) = phase {
        line.push_str(&format!(" [PHASE: {}]", phase));
    }
    if let Some(step) = step {
        line.push_str(&format!(" [STEP: {}]", step));
    }
    line.push_str(&format!(" [{}] {}", target, message));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_sensitive_short_values_fully_masked() {
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive("12345678"), "***");
        assert_eq!(mask_sensitive(""), "");
    }

    #[test]
    fn mask_sensitive_keeps_ends_of_long_values() {
        let masked = mask_sensitive("6f1c0e52-8a7d-4b44-9d3e-1f0a2b3c4d5e");
        assert_eq!(masked, "6f1c...4d5e");
    }

    #[test]
    fn parse_log_metadata_extracts_phase_and_step() {
        let (phase, step, msg) =
            parse_log_metadata("[PHASE: setup] [STEP: admin] Administrator found");
        assert_eq!(phase.as_deref(), Some("setup"));
        assert_eq!(step.as_deref(), Some("admin"));
        assert_eq!(msg, "Administrator found");
    }

    #[test]
    fn parse_log_metadata_without_tags_is_passthrough() {
        let (phase, step, msg) = parse_log_metadata("plain message");
        assert!(phase.is_none());
        assert!(step.is_none());
        assert_eq!(msg, "plain message");
    }

    #[test]
    fn json_log_includes_phase_only_when_present() {
        let line = format_json_log("t", Level::Info, "forum_setup", "hello", Some("setup"), None);
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["phase"], "setup");
        assert_eq!(v["level"], "INFO");
        assert!(v.get("step").is_none());
    }

    #[test]
    fn human_readable_log_layout() {
        let line = format_human_readable_log(
            "2026-01-01 00:00:00.000",
            Level::Warn,
            "forum_setup::setup",
            "Setup Aborted",
            Some("setup"),
            Some("abort"),
        );
        assert_eq!(
            line,
            "[2026-01-01 00:00:00.000] [WARN] [PHASE: setup] [STEP: abort] [forum_setup::setup] Setup Aborted"
        );
    }
}
