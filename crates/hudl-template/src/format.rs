//! Source canonicalizer.
//!
//! Reprints a document in canonical form: four-space indentation, selector
//! sugar (`tag class="foo"` collapses to `tag.foo`, `div` is elided when a
//! selector remains), special links in their `_<rel>` form, reactive
//! blocks merged into one `~` child positioned first, and the parse-time
//! numeric underscore stripped back off. Formatting is idempotent.

use hudl_syntax::{Comment, CommentKind, RawEntry, RawNode, RawValue, SyntaxError};

#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub indent_size: usize,
    pub use_spaces: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            use_spaces: true,
        }
    }
}

impl FormatOptions {
    fn indent(&self, depth: usize) -> String {
        if self.use_spaces {
            " ".repeat(self.indent_size * depth)
        } else {
            "\t".repeat(depth)
        }
    }
}

/// Format source text with default options.
pub fn format_source(source: &str) -> Result<String, SyntaxError> {
    format_with(source, &FormatOptions::default())
}

pub fn format_with(source: &str, options: &FormatOptions) -> Result<String, SyntaxError> {
    let raw = hudl_syntax::parse(source)?;
    let mut printer = Printer {
        options,
        comments: &raw.comments,
        next_comment: 0,
        out: String::new(),
    };
    for node in &raw.nodes {
        printer.flush_comments_before(node.span.start, 0);
        printer.node(node, 0);
    }
    printer.flush_comments_before(usize::MAX, 0);
    Ok(printer.out)
}

struct Printer<'a> {
    options: &'a FormatOptions,
    comments: &'a [Comment],
    next_comment: usize,
    out: String,
}

impl<'a> Printer<'a> {
    fn flush_comments_before(&mut self, offset: usize, depth: usize) {
        while let Some(comment) = self.comments.get(self.next_comment) {
            if comment.span.start >= offset {
                break;
            }
            let indent = self.options.indent(depth);
            match comment.kind {
                CommentKind::Line => {
                    self.out.push_str(&indent);
                    self.out.push_str("// ");
                    self.out.push_str(&comment.text);
                    self.out.push('\n');
                }
                CommentKind::Block => {
                    self.out.push_str(&indent);
                    self.out.push_str("/* ");
                    self.out.push_str(&comment.text);
                    self.out.push_str(" */\n");
                }
                CommentKind::Schema => {
                    self.out.push_str("/**\n");
                    self.out.push_str(&comment.text);
                    self.out.push_str("\n*/\n");
                }
            }
            self.next_comment += 1;
        }
    }

    fn node(&mut self, node: &RawNode, depth: usize) {
        let indent = self.options.indent(depth);

        if node.string_name {
            self.out.push_str(&indent);
            self.print_string_value(&node.name);
            self.out.push('\n');
            return;
        }

        // Special links print in their `_<rel>` shorthand.
        if let Some(()) = self.try_special_link(node, depth) {
            return;
        }

        let (tilde_specs, bind_shorthand, other_children) = partition_children(node);

        self.out.push_str(&indent);
        let name = canonical_name(node);
        self.out.push_str(&name);
        if let Some((signal, modifiers)) = &bind_shorthand {
            self.out.push_str("~>");
            self.out.push_str(signal);
            for modifier in modifiers {
                self.out.push('~');
                self.out.push_str(modifier);
            }
        }

        self.entries(node);

        let has_children = !tilde_specs.is_empty() || !other_children.is_empty();
        match (&node.children, has_children) {
            (Some(_), true) => {
                self.out.push_str(" {\n");
                if !tilde_specs.is_empty() {
                    let tilde_indent = self.options.indent(depth + 1);
                    self.out.push_str(&tilde_indent);
                    self.out.push_str("~ {\n");
                    for spec in &tilde_specs {
                        self.node(spec, depth + 2);
                    }
                    self.out.push_str(&tilde_indent);
                    self.out.push_str("}\n");
                }
                for child in &other_children {
                    self.flush_comments_before(child.span.start, depth + 1);
                    self.node(child, depth + 1);
                }
                self.out.push_str(&indent);
                self.out.push_str("}\n");
            }
            (Some(children), false) if children.is_empty() && bind_shorthand.is_none() => {
                self.out.push_str(" {}\n");
            }
            _ => self.out.push('\n'),
        }
    }

    /// `link rel=stylesheet href="x"` → `_stylesheet "x"`; `script src="x"`
    /// → `_script "x"`. Remaining properties follow the path.
    fn try_special_link(&mut self, node: &RawNode, depth: usize) -> Option<()> {
        let has_children = node
            .children
            .as_ref()
            .is_some_and(|c| !c.is_empty());
        if has_children {
            return None;
        }

        let (shorthand, target_attr, drop_rel) = match node.name.as_str() {
            "link" => {
                let rel = node.property("rel")?.as_str()?;
                if rel != "stylesheet" {
                    return None;
                }
                ("_stylesheet", "href", true)
            }
            "script" => ("_script", "src", false),
            "_stylesheet" => ("_stylesheet", "", false),
            "_script" => ("_script", "", false),
            _ => return None,
        };

        self.out.push_str(&self.options.indent(depth));
        self.out.push_str(shorthand);

        if target_attr.is_empty() {
            // Already in shorthand form; reprint path and extras.
            self.entries(node);
        } else {
            let path = node.property(target_attr)?.as_str()?.to_string();
            self.out.push(' ');
            self.print_string_value(&path);
            for (key, entry) in node.properties() {
                if key == target_attr || (drop_rel && key == "rel") {
                    continue;
                }
                self.out.push(' ');
                self.out.push_str(key);
                self.out.push('=');
                self.print_value(&entry.value);
            }
        }
        self.out.push('\n');
        Some(())
    }

    fn entries(&mut self, node: &RawNode) {
        let is_each = node.name == "each";
        let mut arg_index = 0;
        for entry in &node.entries {
            // class/id merged into the selector are not reprinted.
            if entry_merged_into_selector(node, entry) {
                continue;
            }
            self.out.push(' ');
            if let Some(name) = &entry.name {
                self.out.push_str(name);
                self.out.push('=');
                self.print_value(&entry.value);
            } else if is_each && arg_index == 0 {
                // Loop binding prints bare.
                self.out.push_str(&entry.value.to_display());
                arg_index += 1;
            } else {
                self.print_value(&entry.value);
                arg_index += 1;
            }
        }
    }

    fn print_value(&mut self, value: &RawValue) {
        match value {
            RawValue::String(s) => self.print_string_value(s),
            RawValue::Word(w) => self.out.push_str(&strip_numeric_shim(w)),
            RawValue::Int(i) => self.out.push_str(&i.to_string()),
            RawValue::Float(f) => self.out.push_str(&f.to_string()),
            RawValue::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            RawValue::Null => self.out.push_str("null"),
        }
    }

    fn print_string_value(&mut self, s: &str) {
        // Wrapped backtick expressions print back as `expr`.
        if s.len() >= 2 && s.starts_with('`') && s.ends_with('`') {
            self.out.push_str(s);
            return;
        }
        self.out.push('"');
        for c in s.chars() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                _ => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

/// Children split three ways: reactive specs pulled out of `~` blocks, a
/// lone `bind` spec promoted to the `~>` shorthand, everything else.
fn partition_children(
    node: &RawNode,
) -> (Vec<&RawNode>, Option<(String, Vec<String>)>, Vec<&RawNode>) {
    let mut specs: Vec<&RawNode> = Vec::new();
    let mut rest = Vec::new();

    for child in node.child_nodes() {
        if !child.string_name && child.name == "~" {
            specs.extend(child.child_nodes());
        } else {
            rest.push(child);
        }
    }

    // A bind spec becomes the `~>` shorthand when it is the only thing a
    // tilde block carries for that concern.
    let mut bind = None;
    if let Some(pos) = specs
        .iter()
        .position(|s| s.name == "bind" || s.name.starts_with("bind~"))
    {
        let spec = specs.remove(pos);
        let signal = spec
            .arguments()
            .next()
            .map(|e| e.value.to_display())
            .unwrap_or_default();
        let modifiers = spec
            .name
            .split('~')
            .skip(1)
            .map(str::to_string)
            .collect::<Vec<_>>();
        bind = Some((signal, modifiers));
    }

    (specs, bind, rest)
}

/// Canonical node name: the selector shorthand with `div` elided when a
/// selector remains, static `class`/`id` properties folded in, and the
/// numeric shim stripped.
fn canonical_name(node: &RawNode) -> String {
    let name = strip_numeric_shim(&node.name);

    // Only element-ish names take selector folding.
    if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '.' || c == '#') {
        return name;
    }
    if matches!(
        name.as_str(),
        "if" | "else" | "switch" | "case" | "default" | "each" | "import" | "style" | "el"
    ) {
        return name;
    }

    let mut out = name;
    if let Some(entry) = node.property("id") {
        if let Some(id) = static_text(&entry.value) {
            out.push('#');
            out.push_str(&id);
        }
    }
    if let Some(entry) = node.property("class") {
        if let Some(classes) = static_text(&entry.value) {
            for class in classes.split_whitespace() {
                out.push('.');
                out.push_str(class);
            }
        }
    }

    // `div.card` sugars to `.card`.
    if let Some(rest) = out.strip_prefix("div") {
        if rest.starts_with('.') || rest.starts_with('#') {
            return rest.to_string();
        }
    }
    out
}

fn entry_merged_into_selector(node: &RawNode, entry: &RawEntry) -> bool {
    match entry.name.as_deref() {
        Some("id") | Some("class") => static_text(&entry.value).is_some() && {
            // Folded only for element names (canonical_name does the fold).
            let name = &node.name;
            name.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '.' || c == '#')
                && !matches!(
                    name.as_str(),
                    "if" | "else"
                        | "switch"
                        | "case"
                        | "default"
                        | "each"
                        | "import"
                        | "style"
                        | "el"
                )
        },
        _ => false,
    }
}

fn static_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::String(s) if !s.contains('`') => Some(s.clone()),
        RawValue::Word(w) => Some(w.clone()),
        _ => None,
    }
}

fn strip_numeric_shim(word: &str) -> String {
    if let Some(rest) = word.strip_prefix('_') {
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return rest.to_string();
        }
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(source: &str) -> String {
        format_source(source).unwrap()
    }

    #[test]
    fn collapses_class_attribute_into_selector() {
        let out = fmt("el {\n    div class=\"card wide\" {}\n}");
        assert!(out.contains(".card.wide"), "{out}");
        assert!(!out.contains("class="), "{out}");
    }

    #[test]
    fn elides_div_with_selector() {
        let out = fmt("el {\n    div.card {}\n}");
        assert!(out.contains("    .card"), "{out}");
    }

    #[test]
    fn plain_div_keeps_its_name() {
        let out = fmt("el {\n    div {}\n}");
        assert!(out.contains("    div {}"), "{out}");
    }

    #[test]
    fn indents_with_four_spaces() {
        let out = fmt("el { div { span \"x\" } }");
        assert!(out.contains("\n    div {\n        span \"x\"\n    }\n"), "{out}");
    }

    #[test]
    fn backtick_expressions_survive() {
        let out = fmt("el {\n    h1 `title`\n}");
        assert!(out.contains("h1 `title`"), "{out}");
    }

    #[test]
    fn each_binding_prints_bare() {
        let out = fmt("el {\n    ul {\n        each item `items` {\n            li `item`\n        }\n    }\n}");
        assert!(out.contains("each item `items`"), "{out}");
    }

    #[test]
    fn numeric_shim_is_stripped() {
        let out = fmt("el {\n    section {\n        style {\n            margin \"2rem\"\n            width 10px\n        }\n    }\n}");
        assert!(out.contains("width 10px"), "{out}");
        assert!(!out.contains("_10px"), "{out}");
    }

    #[test]
    fn tilde_blocks_merge_first() {
        let source = "el {\n    div {\n        span \"content\"\n        ~ {\n            show \"$open\"\n        }\n        ~ {\n            on:click \"$n++\"\n        }\n    }\n}";
        let out = fmt(source);
        let tilde_pos = out.find("~ {").unwrap();
        let span_pos = out.find("span").unwrap();
        assert!(tilde_pos < span_pos, "{out}");
        assert_eq!(out.matches("~ {").count(), 1, "{out}");
    }

    #[test]
    fn bind_promotes_to_shorthand() {
        let source = "el {\n    input {\n        ~ {\n            bind query\n        }\n    }\n}";
        let out = fmt(source);
        assert!(out.contains("input~>query"), "{out}");
        assert!(!out.contains("~ {"), "{out}");
    }

    #[test]
    fn special_link_normalizes() {
        let out = fmt("el {\n    head {\n        link rel=stylesheet href=\"/main.css\"\n    }\n}");
        assert!(out.contains("_stylesheet \"/main.css\""), "{out}");
        assert!(!out.contains("rel="), "{out}");
    }

    #[test]
    fn script_link_normalizes() {
        let out = fmt("el {\n    head {\n        script src=\"/app.js\" type=module\n    }\n}");
        assert!(out.contains("_script \"/app.js\" type=module"), "{out}");
    }

    #[test]
    fn comments_preserved_in_order() {
        let source = "// name: Card\n// data: CardData\nel {\n    div {}\n}";
        let out = fmt(source);
        assert!(out.starts_with("// name: Card\n// data: CardData\n"), "{out}");
    }

    #[test]
    fn schema_blocks_preserved() {
        let source = "/**\nmessage D {\n    string a = 1;\n}\n*/\n// name: X\nel {\n    div {}\n}";
        let out = fmt(source);
        assert!(out.starts_with("/**\nmessage D {"), "{out}");
        assert!(out.contains("*/\n// name: X"), "{out}");
    }

    #[test]
    fn idempotent() {
        let sources = [
            "el { div class=\"card\" { h1#title \"Hi\" } }",
            "// name: Card\nel {\n    if `ok` { span \"y\" } else { span \"n\" }\n}",
            "el {\n    input {\n        ~ {\n            bind query\n            on:focus \"$f()\"\n        }\n    }\n}",
            "el {\n    head {\n        _stylesheet \"/s.css\"\n    }\n}",
        ];
        for source in sources {
            let once = fmt(source);
            let twice = fmt(&once);
            assert_eq!(once, twice, "not idempotent for: {source}");
        }
    }
}
