//! HTML escaping.
//!
//! Every scalar that reaches output text or an attribute value goes through
//! [`escape_html`]. Values produced by `raw(...)` skip it via the
//! [`Escaped`] wrapper.
//!
//! Escaped characters:
//! - `<` → `&lt;`
//! - `>` → `&gt;`
//! - `&` → `&amp;`
//! - `"` → `&quot;`
//! - `'` → `&#x27;`

/// Escape HTML special characters.
///
/// # Examples
///
/// ```
/// use hudl_expr::escape_html;
///
/// assert_eq!(escape_html("<x>"), "&lt;x&gt;");
/// assert_eq!(escape_html("a & b"), "a &amp; b");
/// assert_eq!(escape_html(r#"say "hi""#), "say &quot;hi&quot;");
/// ```
pub fn escape_html(s: &str) -> String {
    // Fast path: nothing to escape.
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// A string that is already safe for HTML output and must not be escaped
/// again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escaped(String);

impl Escaped {
    /// Escape `s` now.
    pub fn escape(s: &str) -> Self {
        Escaped(escape_html(s))
    }

    /// Wrap a string that is already safe (output of `raw(...)`).
    pub fn trusted(s: impl Into<String>) -> Self {
        Escaped(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Escaped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
