use crate::errors::DomainError;

/// Trims, lowercases, and drops a trailing dot, then rejects anything that
/// isn't a plain ASCII hostname.
pub fn normalize_target(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidTarget("target is empty".to_string()));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(DomainError::InvalidTarget(
            "target contains control characters".to_string(),
        ));
    }
    if !trimmed.is_ascii() {
        return Err(DomainError::InvalidTarget(
            "target must be ASCII".to_string(),
        ));
    }

    let mut lowered = trimmed.to_ascii_lowercase();
    if lowered.ends_with('.') {
        lowered.pop();
    }

    if lowered.is_empty() || lowered.len() > 253 {
        return Err(DomainError::InvalidTarget(
            "target length out of bounds".to_string(),
        ));
    }

    const FORBIDDEN_SUBSTRINGS: &[&str] = &["://"];
    for needle in FORBIDDEN_SUBSTRINGS {
        if lowered.contains(needle) {
            return Err(DomainError::InvalidTarget(format!(
                "target must not contain '{}'",
                needle
            )));
        }
    }
    const FORBIDDEN_CHARS: &[char] = &['/', '\\', '?', '#', '@', ':', ' '];
    if lowered.chars().any(|c| FORBIDDEN_CHARS.contains(&c)) {
        return Err(DomainError::InvalidTarget(
            "target contains an illegal character".to_string(),
        ));
    }

    if lowered.parse::<std::net::IpAddr>().is_ok() {
        return Err(DomainError::InvalidTarget(
            "target must not be an IP literal".to_string(),
        ));
    }

    for label in lowered.split('.') {
        validate_label(label)?;
    }

    Ok(lowered)
}

fn validate_label(label: &str) -> Result<(), DomainError> {
    if label.is_empty() || label.len() > 63 {
        return Err(DomainError::InvalidTarget(format!(
            "label '{}' must be 1-63 characters",
            label
        )));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DomainError::InvalidTarget(format!(
            "label '{}' contains invalid characters",
            label
        )));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(DomainError::InvalidTarget(format!(
            "label '{}' must not start or end with '-'",
            label
        )));
    }
    Ok(())
}
