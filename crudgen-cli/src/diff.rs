//! Line diffs for dry runs

use console::style;
use similar::{ChangeTag, TextDiff};

/// Render the changed hunks between two versions of a file
///
/// Lines are prefixed with `-`, `+` or a space; `color` adds terminal styling.
/// Returns an empty string when the texts are equal.
#[must_use]
pub fn render_diff(original: &str, rendered: &str, color: bool) -> String {
    let diff = TextDiff::from_lines(original, rendered);
    let mut out = String::new();

    for (index, group) in diff.grouped_ops(3).iter().enumerate() {
        if index > 0 {
            out.push_str(&format!("{}\n", style("...").dim()));
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, line) = match change.tag() {
                    ChangeTag::Delete => ('-', format!("-{change}")),
                    ChangeTag::Insert => ('+', format!("+{change}")),
                    ChangeTag::Equal => (' ', format!(" {change}")),
                };
                let line = if line.ends_with('\n') { line } else { format!("{line}\n") };
                if color {
                    let styled = match sign {
                        '-' => style(line).red(),
                        '+' => style(line).green(),
                        _ => style(line),
                    };
                    out.push_str(&styled.to_string());
                } else {
                    out.push_str(&line);
                }
            }
        }
    }

    out
}
