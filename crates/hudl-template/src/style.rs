//! Scoped CSS.
//!
//! Each style block gets a class name derived from its source span
//! (`h-<hash>`, stable across renders of the same document), appended to
//! the enclosing element's class list. Flat declarations land under
//! `.h-<hash>`; nested rules are prefixed with it. The parse-time
//! underscore shim on numeric values (`_10px`) is stripped here.

use crate::ast::StyleBlock;

/// Class name for a style block: `h-` plus an FNV-1a hash of the
/// component name and block span.
pub fn scope_class(component: &str, block: &StyleBlock) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut mix = |bytes: &[u8]| {
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(0x100000001b3);
        }
    };
    mix(component.as_bytes());
    mix(&block.span.start.to_le_bytes());
    mix(&block.span.end.to_le_bytes());
    format!("h-{:08x}", (hash >> 32) as u32 ^ hash as u32)
}

/// Serialize a style block under its scope class.
pub fn serialize(block: &StyleBlock, class: &str) -> String {
    let mut out = String::new();

    if !block.declarations.is_empty() {
        out.push_str(&format!(".{class} {{ "));
        for (prop, value) in &block.declarations {
            out.push_str(&format!("{prop}: {}; ", strip_shim(value)));
        }
        out.push_str("}\n");
    }

    for rule in &block.rules {
        out.push_str(&format!(".{class} {} {{ ", rewrite_selector(&rule.selector)));
        for (prop, value) in &rule.declarations {
            out.push_str(&format!("{prop}: {}; ", strip_shim(value)));
        }
        out.push_str("}\n");
    }

    out
}

/// Drop the parse-time underscore from numeric-prefixed values:
/// `_10px` → `10px`, value lists included.
pub fn strip_shim(value: &str) -> String {
    value
        .split(' ')
        .map(|token| {
            if let Some(rest) = token.strip_prefix('_') {
                if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    return rest.to_string();
                }
            }
            token.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn rewrite_selector(selector: &str) -> String {
    selector.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StyleRule;
    use hudl_syntax::Span;

    fn block(span: Span) -> StyleBlock {
        StyleBlock {
            declarations: vec![
                ("margin".into(), "_0".into()),
                ("padding".into(), "_1rem _2rem".into()),
            ],
            rules: vec![StyleRule {
                selector: ".inner".into(),
                declarations: vec![("color".into(), "red".into())],
            }],
            span,
        }
    }

    #[test]
    fn class_is_stable_per_span() {
        let a = scope_class("Card", &block(Span::new(10, 50)));
        let b = scope_class("Card", &block(Span::new(10, 50)));
        assert_eq!(a, b);
        assert!(a.starts_with("h-"));
    }

    #[test]
    fn class_differs_across_spans_and_components() {
        let a = scope_class("Card", &block(Span::new(10, 50)));
        let b = scope_class("Card", &block(Span::new(60, 90)));
        let c = scope_class("Other", &block(Span::new(10, 50)));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn serialize_scopes_and_strips_shim() {
        let css = serialize(&block(Span::new(0, 1)), "h-abc");
        assert!(css.contains(".h-abc { margin: 0; padding: 1rem 2rem; }"));
        assert!(css.contains(".h-abc .inner { color: red; }"));
        assert!(!css.contains('_'));
    }

    #[test]
    fn strip_shim_leaves_plain_values() {
        assert_eq!(strip_shim("red"), "red");
        assert_eq!(strip_shim("_moz-thing"), "_moz-thing");
        assert_eq!(strip_shim("_2rem"), "2rem");
    }
}
