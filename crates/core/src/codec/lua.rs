/// Escape a string as a double-quoted Lua literal.
///
/// Control characters with short escapes, quotes, and backslashes get their
/// backslash forms; all other bytes pass through verbatim (UTF-8 included).
pub(crate) fn escape(src: &str) -> String {
    let mut out = String::with_capacity(src.len() + 2);
    out.push('"');
    for c in src.chars() {
        match c {
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Replace characters that would break the comma-separated choice-list
/// syntax with their full-width lookalikes: `=` to U+FF1D, `,` to U+FF0C.
pub(crate) fn sanitize_choice_name(src: &str) -> String {
    src.chars()
        .map(|c| match c {
            '=' => '＝',
            ',' => '，',
            other => other,
        })
        .collect()
}
