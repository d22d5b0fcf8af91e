//! Built-in trim engine.
//!
//! Deliberately small default implementation of [`TrimEnginePort`]: strips
//! shell prompts and box-drawing borders, merges backslash continuations,
//! and flattens multi-line snippets into one runnable line. The serious
//! transformation work is meant to live behind the port; the watcher makes
//! no assumption beyond the port contract.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use tb_core::ports::TrimEnginePort;
use tb_core::trim::{Aggressiveness, TrimOptions, TrimOutcome, TrimReason};

pub struct BasicTrimEngine;

static OPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(&&|\|\||;|\|)\s*").expect("operator regex"));

impl TrimEnginePort for BasicTrimEngine {
    fn trim(
        &self,
        input: &str,
        aggressiveness: Aggressiveness,
        options: &TrimOptions,
    ) -> Result<TrimOutcome> {
        let normalized = normalize_newlines(input);
        let line_count = normalized.split('\n').count();
        if line_count > options.max_lines {
            return Ok(TrimOutcome {
                output: input.to_string(),
                changed: false,
                reason: Some(TrimReason::SkippedTooLarge),
            });
        }

        let mut did_prompt_strip = false;
        let mut did_box_strip = false;
        let mut did_backslash_merge = false;
        let mut parts: Vec<String> = Vec::new();
        let mut blank_runs = 0usize;

        for line in normalized.split('\n') {
            let mut current = line.to_string();

            if options.trim_prompts {
                let stripped = strip_prompt(&current, aggressiveness);
                if stripped != current {
                    did_prompt_strip = true;
                    current = stripped;
                }
            }

            if options.strip_box_chars {
                let stripped = strip_box_border(&current, aggressiveness);
                if stripped != current {
                    did_box_strip = true;
                    current = stripped;
                }
            }

            if current.trim().is_empty() {
                if options.keep_blank_lines {
                    blank_runs += 1;
                }
                continue;
            }

            let mut piece = current.trim_end().to_string();
            if piece.ends_with('\\') {
                did_backslash_merge = true;
                while piece.ends_with('\\') {
                    piece.pop();
                }
                piece.truncate(piece.trim_end().len());
            }
            parts.push(piece);
        }

        let mut output = parts.join(" ");
        output = collapse_spacing(&output);
        if options.keep_blank_lines && blank_runs > 0 {
            // Preserved blank separation collapses to a single break.
            output.push('\n');
        }

        let changed = output != normalized && !output.is_empty();
        if !changed {
            return Ok(TrimOutcome::unchanged(input));
        }

        let reason = if did_backslash_merge {
            TrimReason::BackslashMerged
        } else if did_box_strip {
            TrimReason::BoxCharsRemoved
        } else if did_prompt_strip {
            TrimReason::PromptStripped
        } else {
            TrimReason::Flattened
        };

        Ok(TrimOutcome {
            output,
            changed: true,
            reason: Some(reason),
        })
    }
}

fn normalize_newlines(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn strip_prompt(line: &str, aggressiveness: Aggressiveness) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, trimmed) = line.split_at(indent_len);

    for prefix in ["$ ", "# ", "% ", "❯ "] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return format!("{indent}{rest}");
        }
    }

    // [user@host dir]$ command
    for marker in ["]$ ", "]% "] {
        if let Some(idx) = trimmed.find(marker) {
            return format!("{indent}{}", &trimmed[idx + marker.len()..]);
        }
    }

    if matches!(aggressiveness, Aggressiveness::High) {
        if let Some(rest) = trimmed.strip_prefix("> ") {
            return format!("{indent}{rest}");
        }
    }

    line.to_string()
}

fn strip_box_border(line: &str, aggressiveness: Aggressiveness) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, trimmed) = line.split_at(indent_len);

    // Leave fenced code markers alone.
    if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
        return line.to_string();
    }

    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return line.to_string();
    };

    let is_border = matches!(first, '│' | '┃' | '▕' | '|')
        || (matches!(aggressiveness, Aggressiveness::High) && first == '>');
    if is_border {
        let rest = chars.as_str().trim_start_matches(' ');
        return format!("{indent}{rest}");
    }

    line.to_string()
}

fn collapse_spacing(input: &str) -> String {
    let normalized = OPS_RE.replace_all(input, " $1 ");
    let mut out = String::with_capacity(normalized.len());
    let mut last_space = false;
    for ch in normalized.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trim(input: &str) -> TrimOutcome {
        BasicTrimEngine
            .trim(input, Aggressiveness::Normal, &TrimOptions::default())
            .unwrap()
    }

    #[test]
    fn backslash_continuations_merge_to_one_line() {
        let input = "kubectl get pods \\\n  -n kube-system \\\n  | jq '.items[].metadata.name'";
        let outcome = trim(input);
        assert!(outcome.changed);
        assert_eq!(
            outcome.output,
            "kubectl get pods -n kube-system | jq '.items[].metadata.name'"
        );
        assert_eq!(outcome.reason, Some(TrimReason::BackslashMerged));
    }

    #[test]
    fn prompts_are_stripped() {
        let outcome = trim("$ cargo build --release");
        assert!(outcome.changed);
        assert_eq!(outcome.output, "cargo build --release");
        assert_eq!(outcome.reason, Some(TrimReason::PromptStripped));
    }

    #[test]
    fn single_line_without_noise_is_unchanged() {
        let outcome = trim("ls -la");
        assert!(!outcome.changed);
        assert_eq!(outcome.output, "ls -la");
    }

    #[test]
    fn too_many_lines_skips_with_reason() {
        let input = (0..20).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let outcome = trim(&input);
        assert!(!outcome.changed);
        assert_eq!(outcome.reason, Some(TrimReason::SkippedTooLarge));
        assert_eq!(outcome.output, input);
    }

    #[test]
    fn box_borders_are_removed() {
        let outcome = trim("│ echo hi\n│ echo bye");
        assert!(outcome.changed);
        assert_eq!(outcome.output, "echo hi echo bye");
        assert_eq!(outcome.reason, Some(TrimReason::BoxCharsRemoved));
    }

    #[test]
    fn high_aggressiveness_strips_quote_borders() {
        let outcome = BasicTrimEngine
            .trim("> echo hi", Aggressiveness::High, &TrimOptions::default())
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.output, "echo hi");
    }
}
