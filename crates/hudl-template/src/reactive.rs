//! Reactive-attribute lowering.
//!
//! Reactive attributes are sugar for `data-*` attributes consumed by a
//! client runtime the server never executes. The surface forms (`on:click`,
//! `.active`, `let:count`, `bind`, ...) lower to their output names here;
//! modifiers append as `__name.value` suffixes.

use crate::ast::ReactiveAttr;

/// Lower one reactive attribute to its output attribute name and value.
pub fn lower(attr: &ReactiveAttr) -> (String, Option<String>) {
    let suffix = modifier_suffix(&attr.modifiers);
    let name = &attr.name;

    let html_name = if let Some(class) = name.strip_prefix('.') {
        format!("data-class-{class}{suffix}")
    } else if let Some(class) = name.strip_prefix("class:") {
        format!("data-class-{class}{suffix}")
    } else if let Some(event) = name.strip_prefix("on:") {
        if event == "fetch" {
            // The runtime's own fetch lifecycle event.
            format!("data-on:datastar-fetch{suffix}")
        } else if is_standard_dom_event(event) {
            format!("data-on-{event}{suffix}")
        } else {
            // Custom events keep the colon and kebab-case their name.
            format!("data-on:{}{suffix}", kebab_case(event))
        }
    } else if let Some(signal) = name.strip_prefix("let:") {
        if is_computed(attr.value.as_deref()) {
            format!("data-computed-{signal}{suffix}")
        } else {
            format!("data-signals-{signal}{suffix}")
        }
    } else {
        match name.as_str() {
            "bind" => format!("data-bind{suffix}"),
            "show" => format!("data-show{suffix}"),
            "text" => format!("data-text{suffix}"),
            "ref" => format!("data-ref{suffix}"),
            "persist" => format!("data-persist{suffix}"),
            "teleport" => format!("data-teleport{suffix}"),
            "scrollIntoView" => format!("data-scroll-into-view{suffix}"),
            other => format!("data-attr-{other}{suffix}"),
        }
    };

    let html_value = attr.value.as_ref().map(|v| {
        if name.starts_with("let:") && !is_computed(Some(v)) {
            quote_signal_literal(v)
        } else {
            v.clone()
        }
    });

    (html_name, html_value)
}

/// `["once", "prevent"]` → `__once__prevent`; modifier parameters swap
/// their `:` for `.` (`debounce:300ms` → `__debounce.300ms`).
fn modifier_suffix(modifiers: &[String]) -> String {
    if modifiers.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = modifiers.iter().map(|m| m.replace(':', ".")).collect();
    format!("__{}", parts.join("__"))
}

/// The static/computed signal classifier: operators, function calls, or
/// signal references make a `let:` computed.
fn is_computed(value: Option<&str>) -> bool {
    let Some(v) = value else { return false };
    let has_operator = v.contains('+')
        || v.contains('-')
        || v.contains('*')
        || v.contains('/')
        || v.contains("==")
        || v.contains("!=")
        || v.contains("&&")
        || v.contains("||")
        || v.contains('>')
        || v.contains('<')
        || v.contains('?')
        || v.contains(':');
    let has_call = v.contains('(') && !v.starts_with('(');
    let has_signal = v.contains('$');
    has_operator || has_call || has_signal
}

/// Static signal values that are not already literals get single quotes so
/// the client runtime reads them as strings.
fn quote_signal_literal(v: &str) -> String {
    if v.starts_with('"')
        || v.starts_with('\'')
        || v.parse::<f64>().is_ok()
        || v == "true"
        || v == "false"
        || v == "null"
    {
        v.to_string()
    } else {
        format!("'{v}'")
    }
}

/// camelCase → kebab-case for custom event names.
fn kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The concrete allowlist of standard DOM events that lower to the dash
/// form. Key modifiers like `keydown.enter` check their base name.
fn is_standard_dom_event(event: &str) -> bool {
    let base = event.split('.').next().unwrap_or(event);
    matches!(
        base,
        "click"
            | "dblclick"
            | "mousedown"
            | "mouseup"
            | "mousemove"
            | "mouseenter"
            | "mouseleave"
            | "mouseover"
            | "mouseout"
            | "wheel"
            | "contextmenu"
            | "keydown"
            | "keyup"
            | "keypress"
            | "focus"
            | "blur"
            | "focusin"
            | "focusout"
            | "input"
            | "change"
            | "submit"
            | "reset"
            | "invalid"
            | "scroll"
            | "resize"
            | "load"
            | "unload"
            | "error"
            | "abort"
            | "drag"
            | "dragstart"
            | "dragend"
            | "dragenter"
            | "dragleave"
            | "dragover"
            | "drop"
            | "touchstart"
            | "touchend"
            | "touchmove"
            | "touchcancel"
            | "pointerdown"
            | "pointerup"
            | "pointermove"
            | "pointerenter"
            | "pointerleave"
            | "animationstart"
            | "animationend"
            | "animationiteration"
            | "transitionstart"
            | "transitionend"
            | "transitionrun"
            | "transitioncancel"
            | "copy"
            | "cut"
            | "paste"
            | "select"
            | "selectstart"
            | "intersect"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hudl_syntax::Span;
    use rstest::rstest;

    fn attr(name: &str, value: Option<&str>, modifiers: &[&str]) -> ReactiveAttr {
        ReactiveAttr {
            name: name.to_string(),
            value: value.map(str::to_string),
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            span: Span::default(),
        }
    }

    #[rstest]
    #[case("bind", Some("query"), "data-bind", Some("query"))]
    #[case("show", Some("$open"), "data-show", Some("$open"))]
    #[case("text", Some("$msg"), "data-text", Some("$msg"))]
    #[case("ref", Some("panel"), "data-ref", Some("panel"))]
    #[case("teleport", Some("#modal"), "data-teleport", Some("#modal"))]
    #[case("scrollIntoView", None, "data-scroll-into-view", None)]
    #[case("persist", None, "data-persist", None)]
    #[case("persist", Some("session"), "data-persist", Some("session"))]
    #[case(".warn", Some("$isWarn"), "data-class-warn", Some("$isWarn"))]
    #[case("class:warn", Some("$isWarn"), "data-class-warn", Some("$isWarn"))]
    #[case("on:click", Some("@post('/x')"), "data-on-click", Some("@post('/x')"))]
    #[case("disabled", Some("$busy"), "data-attr-disabled", Some("$busy"))]
    fn lowers(
        #[case] name: &str,
        #[case] value: Option<&str>,
        #[case] expected_name: &str,
        #[case] expected_value: Option<&str>,
    ) {
        let (n, v) = lower(&attr(name, value, &[]));
        assert_eq!(n, expected_name);
        assert_eq!(v.as_deref(), expected_value);
    }

    #[test]
    fn static_signal_lowers_to_signals() {
        let (n, v) = lower(&attr("let:count", Some("0"), &[]));
        assert_eq!(n, "data-signals-count");
        assert_eq!(v.as_deref(), Some("0"));
    }

    #[test]
    fn static_signal_bare_word_gets_quoted() {
        let (n, v) = lower(&attr("let:theme", Some("dark"), &[]));
        assert_eq!(n, "data-signals-theme");
        assert_eq!(v.as_deref(), Some("'dark'"));
    }

    #[test]
    fn computed_signal_lowers_to_computed() {
        let (n, v) = lower(&attr("let:total", Some("$a + $b"), &[]));
        assert_eq!(n, "data-computed-total");
        assert_eq!(v.as_deref(), Some("$a + $b"));
    }

    #[test]
    fn custom_event_keeps_colon_and_kebab_cases() {
        let (n, _) = lower(&attr("on:myEvent", Some("$go()"), &[]));
        assert_eq!(n, "data-on:my-event");
    }

    #[test]
    fn fetch_event_maps_to_runtime_name() {
        let (n, _) = lower(&attr("on:fetch", Some("$x"), &[]));
        assert_eq!(n, "data-on:datastar-fetch");
    }

    #[test]
    fn key_modifier_events_stay_standard() {
        let (n, _) = lower(&attr("on:keydown.enter", Some("$submit()"), &[]));
        assert_eq!(n, "data-on-keydown.enter");
    }

    #[test]
    fn modifiers_append_with_dots() {
        let (n, _) = lower(&attr("on:submit", Some("@post('/l')"), &["prevent", "once"]));
        assert_eq!(n, "data-on-submit__prevent__once");

        let (n, _) = lower(&attr("bind", Some("q"), &["debounce:300ms"]));
        assert_eq!(n, "data-bind__debounce.300ms");

        let (n, _) = lower(&attr("let:count", Some("0"), &["ifmissing"]));
        assert_eq!(n, "data-signals-count__ifmissing");
    }
}
