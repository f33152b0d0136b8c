/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip a single surrounding markdown code fence (```` ```markdown ````,
/// ```` ```md ```` or a bare fence) from a response.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    // Separate blocks at either end, not one wrapping fence.
    if inner.lines().any(|line| line.trim_start().starts_with("```")) {
        return trimmed;
    }
    // Drop the info string on the opening fence line.
    match inner.find('\n') {
        Some(newline) if !inner[..newline].contains(' ') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}
