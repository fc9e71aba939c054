//! Curly-brace cloze deletions.
//!
//! `{text}` becomes `{{c1::text}}`, `{2:text}` / `{c2|text}` keep their
//! number. A span opens on a `{` that isn't part of `{{`, may not contain a
//! blank line, and closes on the first lone `}`.

use regex::Regex;
use std::sync::LazyLock;

static HIGHLIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==([^=\n](?:[^\n]*?[^=\n])?)==").expect("Invalid highlight regex"));

static ANKI_CLOZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{c\d+::?[\s\S]+?\}\}").expect("Invalid cloze regex"));

/// Cloze output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClozeStyle {
    /// `{{cN::text}}`, unlabeled spans numbered from 1.
    Numbered,
    /// `{{c1:text}}`, read by a custom card template.
    Custom,
}

/// Turn `==highlights==` into curly cloze spans.
#[must_use]
pub fn highlights_to_curly(text: &str) -> String {
    HIGHLIGHT.replace_all(text, "{${1}}").into_owned()
}

/// Turn `==highlights==` into `<mark>` elements.
#[must_use]
pub fn highlights_to_mark(text: &str) -> String {
    HIGHLIGHT.replace_all(text, "<mark>${1}</mark>").into_owned()
}

/// Whether `text` contains at least one cloze deletion, in either the
/// Anki (`{{c1::..}}`) or the custom template (`{{c1:..}}`) form.
#[must_use]
pub fn has_cloze(text: &str) -> bool {
    ANKI_CLOZE.is_match(text)
}

/// Convert every curly span in `text`.
///
/// The auto-number counter starts at 1 on every call.
#[must_use]
pub fn curly_to_cloze(text: &str, style: ClozeStyle) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut next_number = 1_u32;
    let mut i = 0;

    while i < chars.len() {
        if let Some(span) = match_span(&chars, i) {
            let content: String = chars[span.content_start..span.content_end].iter().collect();
            match style {
                ClozeStyle::Custom => {
                    out.push_str("{{c1:");
                    out.push_str(&content);
                    out.push_str("}}");
                }
                ClozeStyle::Numbered => {
                    let number = span.label.unwrap_or_else(|| {
                        let n = next_number.to_string();
                        next_number += 1;
                        n
                    });
                    out.push_str("{{c");
                    out.push_str(&number);
                    out.push_str("::");
                    out.push_str(&content);
                    out.push_str("}}");
                }
            }
            i = span.end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

struct Span {
    label: Option<String>,
    content_start: usize,
    content_end: usize,
    /// One past the closing brace.
    end: usize,
}

fn match_span(chars: &[char], open: usize) -> Option<Span> {
    if chars[open] != '{' || (open > 0 && chars[open - 1] == '{') {
        return None;
    }

    // A label followed by `{` is retried as plain content.
    let (label, start) = match parse_label(chars, open + 1) {
        Some((label, after)) if chars.get(after) != Some(&'{') => (Some(label), after),
        _ => (None, open + 1),
    };
    if chars.get(start) == Some(&'{') {
        return None;
    }

    let mut k = start;
    loop {
        // Each unit is one non-newline char plus at most one newline.
        match chars.get(k) {
            None | Some('\n') => return None,
            Some(_) => k += 1,
        }
        if chars.get(k) == Some(&'\n') {
            k += 1;
        }
        if closes_at(chars, k) {
            return Some(Span {
                label,
                content_start: start,
                content_end: k,
                end: k + 1,
            });
        }
    }
}

fn closes_at(chars: &[char], k: usize) -> bool {
    chars.get(k) == Some(&'}') && chars[k - 1] != '}' && chars.get(k + 1) != Some(&'}')
}

/// Parse `c?<digits>[:|]` starting at `i`.
fn parse_label(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    if chars.get(i) == Some(&'c') {
        i += 1;
    }
    let digits_start = i;
    while chars.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    let label: String = chars[digits_start..i].iter().collect();
    match chars.get(i) {
        Some(':' | '|') => Some((label, i + 1)),
        _ => None,
    }
}
