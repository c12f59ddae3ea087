//! Sugar normalizer.
//!
//! Rewrites Hudl source into strictly-grammatical form before parsing.
//! Three rules, applied in one string-aware pass:
//!
//! 1. Numeric-prefix fixup: `10px` becomes `_10px` so CSS-like literals
//!    survive the identifier grammar. The interpreter strips the underscore
//!    again when serializing CSS values.
//! 2. Condensed else: `} else` becomes `}` + newline + `else`, which lets
//!    the node grammar see `else` as a new sibling node.
//! 3. Backtick wrapping: `` `expr` `` becomes a raw string ``#"`expr`"#``
//!    with enough hashes to survive any embedded `"#` sequence.
//!
//! Comments and string literals pass through byte-for-byte. The normalizer
//! never fails; anything it cannot improve is left for the parser to report.

/// Normalize raw source text.
///
/// Idempotent: running the output through the normalizer again produces the
/// same text.
pub fn normalize(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Comments pass through unchanged.
        if c == '/' && i + 1 < chars.len() {
            if chars[i + 1] == '/' {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
                continue;
            }
            if chars[i + 1] == '*' {
                out.push(chars[i]);
                out.push(chars[i + 1]);
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && i + 1 < chars.len() && chars[i + 1] == '/' {
                        out.push('*');
                        out.push('/');
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                continue;
            }
        }

        // Quoted strings pass through, honoring escapes.
        if c == '"' {
            out.push(c);
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    out.push(chars[i]);
                    out.push(chars[i + 1]);
                    i += 2;
                } else {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            if i < chars.len() {
                out.push('"');
                i += 1;
            }
            continue;
        }

        // Raw strings #"..."# pass through (any hash depth).
        if c == '#' && hash_run_opens_raw(&chars, i) {
            let hashes = count_hashes(&chars, i);
            for _ in 0..hashes {
                out.push('#');
            }
            out.push('"');
            i += hashes + 1;
            while i < chars.len() {
                if chars[i] == '"' && closes_raw(&chars, i, hashes) {
                    out.push('"');
                    for _ in 0..hashes {
                        out.push('#');
                    }
                    i += hashes + 1;
                    break;
                }
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }

        // Rule 3: wrap a standalone backtick expression in a raw string.
        if c == '`' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != '`' {
                i += 1;
            }
            if i < chars.len() {
                let expr: String = chars[start..=i].iter().collect();
                out.push_str(&wrap_raw(&expr));
                i += 1;
            } else {
                // Unterminated backtick: leave it for the parser to reject.
                out.push('`');
            }
            continue;
        }

        // Rule 2: split `} else` onto two lines.
        if c == '}' {
            out.push('}');
            i += 1;
            let mut j = i;
            while j < chars.len() && (chars[j] == ' ' || chars[j] == '\t') {
                j += 1;
            }
            if lookahead_is_keyword(&chars, j, "else") {
                out.push('\n');
                i = j;
            }
            continue;
        }

        // Rule 1: numeric-prefix fixup at token boundaries.
        if c.is_ascii_digit() && at_token_boundary(&chars, i) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '%') {
                out.push('_');
                for &d in &chars[start..i] {
                    out.push(d);
                }
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '%') {
                    out.push(chars[i]);
                    i += 1;
                }
            } else {
                for &d in &chars[start..i] {
                    out.push(d);
                }
            }
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

/// Wrap a backtick expression in a raw string with enough hashes that no
/// embedded `"#...` sequence can terminate it early.
fn wrap_raw(expr: &str) -> String {
    let mut hashes = 1;
    loop {
        let closer: String = std::iter::once('"').chain("#".repeat(hashes).chars()).collect();
        if !expr.contains(&closer) {
            break;
        }
        hashes += 1;
    }
    let h = "#".repeat(hashes);
    format!("{h}\"{expr}\"{h}")
}

fn count_hashes(chars: &[char], mut i: usize) -> usize {
    let mut n = 0;
    while i < chars.len() && chars[i] == '#' {
        n += 1;
        i += 1;
    }
    n
}

/// `#` runs open a raw string only when immediately followed by `"`.
fn hash_run_opens_raw(chars: &[char], i: usize) -> bool {
    let n = count_hashes(chars, i);
    n > 0 && chars.get(i + n) == Some(&'"')
}

fn closes_raw(chars: &[char], quote: usize, hashes: usize) -> bool {
    (1..=hashes).all(|k| chars.get(quote + k) == Some(&'#'))
}

fn lookahead_is_keyword(chars: &[char], i: usize, word: &str) -> bool {
    let w: Vec<char> = word.chars().collect();
    if i + w.len() > chars.len() {
        return false;
    }
    if chars[i..i + w.len()] != w[..] {
        return false;
    }
    match chars.get(i + w.len()) {
        Some(c) => !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'),
        None => true,
    }
}

/// Numeric fixup only applies to tokens starting after whitespace or a
/// structural delimiter, never mid-word (`grid2col` stays intact).
fn at_token_boundary(chars: &[char], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    matches!(chars[i - 1], ' ' | '\t' | '\n' | '\r' | '{' | '}' | ';')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("div 10px", "div _10px")]
    #[case("div 2rem", "div _2rem")]
    #[case("div 1.2rem", "div _1.2rem")]
    #[case("div 100%", "div _100%")]
    #[case("div 42", "div 42")]
    fn numeric_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn numeric_prefix_skips_mid_word() {
        assert_eq!(normalize("div grid2col"), "div grid2col");
    }

    #[test]
    fn numeric_prefix_skips_strings() {
        let input = r#"p "width: 10px""#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn condensed_else_splits() {
        assert!(normalize("} else {").contains("}\nelse"));
        assert!(normalize("}\t\telse {").contains("}\nelse"));
    }

    #[test]
    fn elsewhere_is_not_else() {
        let out = normalize("} elsewhere {");
        assert!(!out.contains("}\nelsewhere"));
    }

    #[test]
    fn backtick_wrapping() {
        let out = normalize("span `name`");
        assert_eq!(out, "span #\"`name`\"#");
    }

    #[test]
    fn backtick_preserves_inner_quotes() {
        let out = normalize(r#"span `active ? "yes" : "no"`"#);
        assert!(out.contains(r##"#"`active ? "yes" : "no"`"#"##));
    }

    #[test]
    fn backtick_in_attribute_value() {
        let out = normalize("a href=`user.url`");
        assert_eq!(out, "a href=#\"`user.url`\"#");
    }

    #[test]
    fn backtick_inside_string_untouched() {
        let input = r#"p "Use `code` for inline""#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn comments_pass_through() {
        let input = "// 10px } else `x`\ndiv";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn schema_block_passes_through() {
        let input = "/**\nmessage User {\n    string name = 1;\n}\n*/";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn raw_string_passes_through() {
        let input = "p #\"raw & 10px\"#";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn idempotent() {
        let input = "el {\n    if `ok` { div 10px } else { span `x` }\n}";
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn unterminated_backtick_left_alone() {
        assert_eq!(normalize("span `oops"), "span `oops");
    }
}
