//! Single-line preview of the last watcher action.

const SUMMARY_LIMIT: usize = 90;

/// Flatten text to one line and middle-ellipsize it for menu display.
pub fn summarize(text: &str) -> String {
    let single_line: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    ellipsize(single_line.trim(), SUMMARY_LIMIT)
}

fn ellipsize(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if limit < 4 || chars.len() <= limit {
        return text.to_string();
    }
    let keep = limit - 3;
    let head = keep / 2;
    let tail = keep - head;
    let mut out: String = chars[..head].iter().collect();
    out.push_str("...");
    out.extend(&chars[chars.len() - tail..]);
    out
}
