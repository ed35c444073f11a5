//! Sheet name to directory segment mapping.

/// Characters rejected by the most restrictive common filesystem.
pub const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maps a sheet name to a filesystem-safe directory segment.
///
/// Surrounding whitespace is trimmed, every illegal character becomes `_`,
/// each run of whitespace becomes a single `_`, and a run of leading or
/// trailing dots becomes a single `_`.
///
/// The result never contains whitespace or [`ILLEGAL_CHARS`] and never
/// starts or ends with a dot, so `sanitize(&sanitize(x)) == sanitize(x)`.
///
/// # Example
///
/// ```
/// use qrsheets::sanitize::sanitize;
///
/// assert_eq!(sanitize("Q1/Sales:2024"), "Q1_Sales_2024");
/// assert_eq!(sanitize("  .hidden.  "), "_hidden_");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        out.push(if ILLEGAL_CHARS.contains(&c) { '_' } else { c });
    }

    let body = out.trim_start_matches('.');
    let leading = body.len() != out.len();
    let trimmed = body.trim_end_matches('.');
    let trailing = trimmed.len() != body.len();

    let mut result = String::with_capacity(trimmed.len() + 2);
    if leading {
        result.push('_');
    }
    result.push_str(trimmed);
    if trailing {
        result.push('_');
    }
    result
}

/// Directory segment for the sheet at `index` (0-based).
///
/// Falls back to `sheet-{index + 1}` when the sheet has no name or its name
/// sanitizes to nothing.
pub fn directory_name(name: Option<&str>, index: usize) -> String {
    match name.map(sanitize) {
        Some(dir) if !dir.is_empty() => dir,
        _ => format!("sheet-{}", index + 1),
    }
}
