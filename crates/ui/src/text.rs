use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Word-wraps to `max_width` columns, splitting words that cannot fit on a line.
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let width = UnicodeWidthStr::width(word);
        let used = UnicodeWidthStr::width(current.as_str());
        let sep = usize::from(!current.is_empty());

        if used + sep + width <= max_width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if width <= max_width {
            current.push_str(word);
            continue;
        }

        let mut chunk_width = 0usize;
        for ch in word.chars() {
            let w = ch.width().unwrap_or(0);
            if chunk_width + w > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                chunk_width = 0;
            }
            current.push(ch);
            chunk_width += w;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Cuts to `max_width` columns, ending with an ellipsis when something was dropped.
pub(crate) fn truncate(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Wrapped to at most `max_lines`, the last line truncated if text remains.
pub(crate) fn clamp_lines(text: &str, max_width: usize, max_lines: usize) -> Vec<String> {
    let mut lines = wrap_text(text, max_width);
    if lines.len() > max_lines && max_lines > 0 {
        let rest = lines.split_off(max_lines - 1).join(" ");
        lines.push(truncate(&rest, max_width));
    }
    lines
}
