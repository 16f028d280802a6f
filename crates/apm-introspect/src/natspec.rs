//! `@notice` extraction from NatSpec comments

use crate::syntax::ParsedSource;
use tree_sitter::Node;

/// Notice text of the doc comment block directly above `node`
///
/// Reads the contiguous run of comment siblings preceding the definition;
/// plain `//` and `/* */` comments are skipped.
pub(crate) fn notice_for(parsed: &ParsedSource<'_>, node: Node<'_>) -> Option<String> {
    let mut comments = Vec::new();
    let mut cursor = node.prev_sibling();
    while let Some(sibling) = cursor {
        if sibling.kind() != "comment" {
            break;
        }
        comments.push(parsed.text(sibling));
        cursor = sibling.prev_sibling();
    }
    comments.reverse();

    let lines: Vec<&str> = comments.iter().flat_map(|c| doc_lines(c)).collect();
    notice(&lines)
}

/// Content lines of one doc comment, markers stripped
fn doc_lines(comment: &str) -> Vec<&str> {
    if let Some(line) = comment.strip_prefix("///") {
        return vec![line.trim()];
    }
    if let Some(body) = comment.strip_prefix("/**") {
        let body = body.strip_suffix("*/").unwrap_or(body);
        return body
            .lines()
            .map(|l| {
                let l = l.trim();
                l.strip_prefix('*').unwrap_or(l).trim()
            })
            .collect();
    }
    Vec::new()
}

/// `@notice` text, or leading untagged text when no `@notice` is present
fn notice(lines: &[&str]) -> Option<String> {
    let mut untagged = Vec::new();
    let mut tagged = Vec::new();
    let mut seen_tag = false;
    let mut in_notice = false;

    for line in lines.iter().filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix('@') {
            seen_tag = true;
            in_notice = false;
            if let Some(text) = rest.strip_prefix("notice") {
                in_notice = true;
                push_words(&mut tagged, text);
            }
        } else if in_notice {
            push_words(&mut tagged, line);
        } else if !seen_tag {
            push_words(&mut untagged, line);
        }
    }

    let words = if tagged.is_empty() { untagged } else { tagged };
    (!words.is_empty()).then(|| words.join(" "))
}

fn push_words<'a>(out: &mut Vec<&'a str>, text: &'a str) {
    out.extend(text.split_whitespace());
}
