//! Turning backend text into inert display text.
//!
//! Answers and citations are copied out of uploaded documents, so they can
//! contain anything, including terminal escape sequences. Nothing from the
//! backend is ever interpreted: control characters are shown in their
//! escaped `\u{..}` form and markup characters stay literal.

/// Escape control characters other than newline and tab.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.extend(c.escape_unicode());
        } else {
            out.push(c);
        }
    }
    out
}

/// Sanitize a single-line value, flattening embedded line breaks into spaces.
pub fn sanitize_line(text: &str) -> String {
    sanitize(&text.replace(['\r', '\n'], " "))
}

/// Lines rendered under an answer: a header plus one bullet per source.
pub fn citation_lines(sources: &[String]) -> Vec<String> {
    if sources.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::with_capacity(sources.len() + 1);
    lines.push("Sources:".to_string());
    for source in sources {
        lines.push(format!("• {}", sanitize_line(source)));
    }
    lines
}
