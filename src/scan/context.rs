//! Heading context for notes.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Byte offset where the heading starts.
    pub offset: usize,
}

/// Headings of a document in order.
#[must_use]
pub fn headings(text: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    let mut current: Option<Heading> = None;

    for (event, range) in Parser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(Heading {
                    level: level as u8,
                    text: String::new(),
                    offset: range.start,
                });
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push_str(&t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = current.take() {
                    out.push(Heading {
                        text: heading.text.trim().to_string(),
                        ..heading
                    });
                }
            }
            _ => {}
        }
    }

    out
}

/// `path > Heading > Sub-heading` for the headings enclosing `position`.
#[must_use]
pub fn context_at(path: &str, headings: &[Heading], position: usize) -> String {
    let mut stack: Vec<&Heading> = Vec::new();
    for heading in headings {
        if position < heading.offset {
            break;
        }
        let keep = stack
            .iter()
            .take_while(|open| heading.level > open.level)
            .count();
        stack.truncate(keep);
        stack.push(heading);
    }

    let mut parts = vec![path];
    parts.extend(stack.iter().map(|h| h.text.as_str()));
    parts.join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Rust\n\n## Ownership\n\ntext A\n\n## Borrowing\n\n### Rules\n\ntext B\n\n# Go\n\ntext C\n";

    #[test]
    fn test_headings_are_found_with_offsets() {
        let hs = headings(DOC);
        let names: Vec<&str> = hs.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Ownership", "Borrowing", "Rules", "Go"]);
        assert_eq!(hs[0].offset, 0);
        assert_eq!(hs[1].level, 2);
    }

    #[test]
    fn test_context_follows_nesting() {
        let hs = headings(DOC);
        let at = |needle: &str| context_at("a.md", &hs, DOC.find(needle).unwrap());
        assert_eq!(at("text A"), "a.md > Rust > Ownership");
        assert_eq!(at("text B"), "a.md > Rust > Borrowing > Rules");
        assert_eq!(at("text C"), "a.md > Go");
        assert_eq!(context_at("a.md", &[], 5), "a.md");
    }
}
