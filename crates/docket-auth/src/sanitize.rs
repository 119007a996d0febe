//! Sanitization of free text that is later rendered by UIs.

/// Strips control characters, trims, and HTML-escapes `input`.
#[must_use]
pub fn sanitize_free_text(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !c.is_control()).collect();
    html_escape(stripped.trim())
}

/// Escapes HTML special characters.
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
