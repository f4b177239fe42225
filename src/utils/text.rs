use regex::Regex;
use std::sync::LazyLock;

const THINK_OPEN: &str = "<think>";

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|$)").expect("valid think-block pattern"));

/// Calculate the display width of a string, accounting for wide characters
pub fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| match c {
            // Most CJK characters take 2 columns
            '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{303F}'
            | '\u{3040}'..='\u{33FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{A000}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FE10}'..='\u{FE19}'
            | '\u{FE30}'..='\u{FE6F}'
            | '\u{FF00}'..='\u{FFEF}'
            | '\u{20000}'..='\u{2EBEF}' => 2,
            _ => 1,
        })
        .sum()
}

/// Wrap a string into lines with a given maximum display width.
pub fn wrap_text(text: &str, max_line_len: usize) -> Vec<String> {
    let max_line_len = max_line_len.max(1);
    let mut lines = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if display_width(remaining) <= max_line_len {
            lines.push(remaining.to_string());
            break;
        }

        let mut break_pos = 0;
        let mut char_end = 0;
        let mut current_width = 0;
        for (pos, ch) in remaining.char_indices() {
            let char_width = display_width(ch.encode_utf8(&mut [0; 4]));
            if current_width + char_width > max_line_len {
                break;
            }
            if ch == ' ' {
                break_pos = pos;
            }
            char_end = pos + ch.len_utf8();
            current_width += char_width;
        }

        if break_pos > 0 {
            lines.push(remaining[..break_pos].to_string());
            remaining = remaining[break_pos + 1..].trim_start();
        } else {
            // a single character wider than the line still has to go somewhere
            let end = if char_end == 0 {
                remaining.chars().next().map(char::len_utf8).unwrap_or(remaining.len())
            } else {
                char_end
            };
            lines.push(remaining[..end].to_string());
            remaining = &remaining[end..];
        }
    }
    lines
}

/// Removes `<think>…</think>` reasoning blocks. An unterminated block hides everything
/// after its opening tag, which is what a half-streamed block looks like.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").into_owned()
}

/// Visible text of a reply that is still arriving. Besides hiding think blocks, a
/// trailing `<`, `<t`, ... `<think` is held back because the next fragment may complete
/// the tag. Appending to `text` only ever extends the result.
pub fn settled_visible_text(text: &str) -> String {
    let mut visible = strip_think_blocks(text);
    if let Some(start) = visible.rfind('<') {
        if THINK_OPEN.starts_with(&visible[start..]) {
            visible.truncate(start);
        }
    }
    visible
}

pub fn looks_like_markdown(text: &str) -> bool {
    text.contains("```") || text.contains('*') || text.contains('`') || text.contains('#')
}

/// First `max_chars` characters of `text`, with an ellipsis when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
