//! Text rewriting: marker insertion, newline normalization, removals.

use crate::note::MARKER_PATTERN;
use regex::Regex;
use std::sync::LazyLock;

static BARE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MARKER_PATTERN).expect("Invalid marker regex"));

/// A marker with the blanks before it and one newline after it.
static MARKER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"[ \t]*{MARKER_PATTERN}\n?")).expect("Invalid marker regex")
});

/// Insert several strings at byte offsets of the original `text`.
///
/// Inserts are applied in ascending offset order while tracking how much
/// has been inserted so far, so every offset refers to the original text.
/// Inserts at the same offset keep their given order.
#[must_use]
pub fn insert_all(text: &str, mut inserts: Vec<(usize, String)>) -> String {
    inserts.sort_by_key(|(position, _)| *position);

    let mut out = text.to_string();
    let mut offset = 0;
    for (position, insert) in inserts {
        let at = (position + offset).min(out.len());
        out.insert_str(at, &insert);
        offset += insert.len();
    }
    out
}

/// Make every marker that starts a line sit two newlines below the text
/// above it, unless it directly precedes `end_token`.
#[must_use]
pub fn fix_newline_ids(text: &str, end_token: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in BARE_MARKER.find_iter(text) {
        let before = &text[last..m.start()];
        let trimmed = before.trim_end_matches('\n');
        let newlines = before.len() - trimmed.len();

        let after = &text[m.end()..];
        let closes_block = after.strip_prefix('\n').unwrap_or(after).starts_with(end_token);

        if newlines == 0 || closes_block || (trimmed.is_empty() && last == 0) {
            out.push_str(before);
        } else {
            out.push_str(trimmed);
            out.push_str("\n\n");
        }
        out.push_str(m.as_str());
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Remove every match of `pattern` together with one trailing newline.
#[must_use]
pub fn remove_matches(text: &str, pattern: &Regex) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in pattern.find_iter(text) {
        if m.start() < last {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        last = m.end();
        if text[last..].starts_with('\n') {
            last += 1;
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Remove every identifier marker from `text`.
#[must_use]
pub fn strip_markers(text: &str) -> String {
    MARKER_LINE.replace_all(text, "").into_owned()
}

#[must_use]
pub fn count_markers(text: &str) -> usize {
    BARE_MARKER.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Insert from the end of the string backwards, one at a time.
    fn insert_backwards(text: &str, inserts: &[(usize, String)]) -> String {
        let mut sorted: Vec<(usize, usize, &String)> = inserts
            .iter()
            .enumerate()
            .map(|(i, (p, s))| (*p, i, s))
            .collect();
        sorted.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        let mut out = text.to_string();
        for (position, _, insert) in sorted {
            out.insert_str(position, insert);
        }
        out
    }

    #[test]
    fn test_insert_all_matches_backwards_reference() {
        let text = "0123456789abcdef";
        let cases: Vec<Vec<(usize, String)>> = vec![
            vec![],
            vec![(0, "A".into())],
            vec![(16, "END".into())],
            vec![(3, "x".into()), (1, "yy".into()), (10, "zzz".into())],
            vec![(5, "a".into()), (5, "b".into()), (0, "c".into())],
            vec![(8, "\n<!--ID:1-->\n".into()), (2, " ".into()), (15, "q".into())],
        ];

        for inserts in cases {
            assert_eq!(insert_all(text, inserts.clone()), insert_backwards(text, &inserts));
        }
    }

    #[test]
    fn test_fix_newline_ids_normalizes_to_two() {
        let text = "Q: a\nA: b\n\n\n\n<!--ID:1714000000123-->\nnext";
        assert_eq!(
            fix_newline_ids(text, "END"),
            "Q: a\nA: b\n\n<!--ID:1714000000123-->\nnext"
        );

        let text = "Q: a\nA: b\n<!--ID:1714000000123-->";
        assert_eq!(
            fix_newline_ids(text, "END"),
            "Q: a\nA: b\n\n<!--ID:1714000000123-->"
        );
    }

    #[test]
    fn test_fix_newline_ids_leaves_block_and_inline_markers() {
        let block = "START\nBasic\nFront: Q\nBack: A\n<!--ID:1714000000123-->\nEND";
        assert_eq!(fix_newline_ids(block, "END"), block);

        let inline = "STARTI [Basic] Q Back: A <!--ID:1714000000123--> ENDI";
        assert_eq!(fix_newline_ids(inline, "END"), inline);
    }

    #[test]
    fn test_strip_markers() {
        let text = "START\nBasic\nFront: Q\n<!--ID:1714000000123-->\nEND\nSTARTI [Basic] a %%ID:1714000000124%% ENDI";
        assert_eq!(count_markers(text), 2);
        assert_eq!(
            strip_markers(text),
            "START\nBasic\nFront: Q\nEND\nSTARTI [Basic] a ENDI"
        );
    }

    #[test]
    fn test_remove_matches_takes_one_newline() {
        let re = Regex::new(r"DELETE<!--ID:\d{13}-->").unwrap();
        let text = "keep\nDELETE<!--ID:1714000000124-->\nalso keep";
        assert_eq!(remove_matches(text, &re), "keep\nalso keep");
    }
}
