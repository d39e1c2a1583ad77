// Field answer validation
//
// Shared by every answer source (terminal, answers file, environment) so the
// same rules apply no matter where a value came from.

use crate::error::{Result, SetupError};
use crate::models::fields::{Answers, FieldDescriptor};
use regex::Regex;

/// Resolve one raw answer against its descriptor.
///
/// Blank input falls back to the declared default. A blank, non-required field
/// with no default resolves to the empty string. Hidden answers are kept
/// verbatim; visible ones are trimmed.
pub fn resolve_answer(field: &FieldDescriptor, raw: Option<&str>) -> Result<String> {
    let given = raw
        .filter(|s| !s.trim().is_empty())
        .map(|s| if field.hidden { s } else { s.trim() });

    let value = match (given, field.default.as_deref()) {
        (Some(v), _) => v.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) if field.required => {
            return Err(SetupError::validation(field.name, "a value is required"));
        }
        (None, None) => return Ok(String::new()),
    };

    if let Some(pattern) = field.pattern {
        let re = Regex::new(pattern).map_err(|e| {
            SetupError::validation(field.name, format!("invalid pattern '{}': {}", pattern, e))
        })?;
        if !re.is_match(&value) {
            let message = field
                .message
                .map(str::to_string)
                .unwrap_or_else(|| format!("value does not match '{}'", pattern));
            return Err(SetupError::validation(field.name, message));
        }
    }

    Ok(value)
}

/// Resolve every descriptor against a lookup of raw values, in declaration order.
pub fn resolve_all<'a, F>(fields: &[FieldDescriptor], mut lookup: F) -> Result<Answers>
where
    F: FnMut(&str) -> Option<&'a str>,
{
    let mut answers = Answers::new();
    for field in fields {
        let value = resolve_answer(field, lookup(field.name))?;
        answers.insert(field.name, value);
    }
    Ok(answers)
}

/// Parse a TCP port answer (already pattern-checked as digits).
pub fn parse_port(field: &str, value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(SetupError::validation(
            field,
            "Port must be a number between 1 and 65535",
        )),
    }
}
