//! Claimed text spans.

use regex::Regex;

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `self` lies within `other`, with one byte of leeway each side.
    #[must_use]
    pub const fn is_within(&self, other: &Self) -> bool {
        self.start + 1 >= other.start && self.end <= other.end + 1
    }
}

/// Spans already claimed by a higher-priority match. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct SpanSet {
    spans: Vec<Span>,
}

impl SpanSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// Claim every match of `pattern` in `text`.
    pub fn claim_matches(&mut self, pattern: &Regex, text: &str) {
        self.spans
            .extend(pattern.find_iter(text).map(|m| Span::new(m.start(), m.end())));
    }

    /// Whether `span` is inside any claimed span.
    #[must_use]
    pub fn covers(&self, span: Span) -> bool {
        self.spans.iter().any(|claimed| span.is_within(claimed))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Span] {
        &self.spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_allows_one_byte_leeway() {
        let outer = Span::new(10, 20);
        assert!(Span::new(10, 20).is_within(&outer));
        assert!(Span::new(9, 21).is_within(&outer));
        assert!(!Span::new(8, 20).is_within(&outer));
        assert!(!Span::new(10, 22).is_within(&outer));
    }

    #[test]
    fn test_covers_and_claim_matches() {
        let mut set = SpanSet::new();
        set.claim_matches(&Regex::new(r"\$[^$]+\$").unwrap(), "a $x$ b $y$");
        assert_eq!(set.as_slice(), [Span::new(2, 5), Span::new(8, 11)]);
        assert!(set.covers(Span::new(3, 4)));
        assert!(!set.covers(Span::new(0, 6)));
        assert!(!Span::new(0, 6).is_empty());
        assert!(Span::new(4, 4).is_empty());
    }
}
