use std::usize;

/// A byte range in a subject, given as an offset and a length.
///
/// A `Span` is what the range-producing match methods report for the
/// overall match and for each capturing group. Capturing groups that did
/// not take part in a match are reported as `Span::UNSET`, which callers
/// must check for before using the span to index into the subject.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Span {
    offset: usize,
    length: usize,
}

impl Span {
    /// The span reported for a capturing group that did not participate in
    /// a match.
    pub const UNSET: Span = Span { offset: usize::MAX, length: 0 };

    /// Create a new span.
    ///
    /// # Panics
    ///
    /// This panics if `offset + length` overflows.
    #[inline]
    pub fn new(offset: usize, length: usize) -> Span {
        assert!(offset.checked_add(length).is_some());
        Span { offset, length }
    }

    /// Return the offset at which this span starts.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the length of this span in bytes.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Return the offset one past the last byte of this span.
    ///
    /// For `Span::UNSET`, this is the same as the offset.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    /// Returns true if and only if this is `Span::UNSET`.
    #[inline]
    pub fn is_unset(&self) -> bool {
        *self == Span::UNSET
    }
}

/// The result of a match attempt.
///
/// Every match method on a `Matcher` reports one of three things: a match
/// was found (along with whatever data the method extracts), no match was
/// found, or the search was abandoned because it exceeded the matcher's
/// depth limit. The last case means the input was too expensive for the
/// pattern at the configured limit. It says nothing about whether a match
/// exists.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Outcome<T> {
    /// A match was found.
    Match(T),
    /// No match was found. This also covers searches the engine aborted
    /// for reasons other than the depth limit.
    NoMatch,
    /// The search exceeded the matcher's depth limit.
    DepthLimitExceeded,
}

impl<T> Outcome<T> {
    /// Returns true if and only if a match was found.
    pub fn is_match(&self) -> bool {
        match *self {
            Outcome::Match(_) => true,
            _ => false,
        }
    }

    /// Returns true if and only if the search exceeded the depth limit.
    pub fn is_depth_limit_exceeded(&self) -> bool {
        match *self {
            Outcome::DepthLimitExceeded => true,
            _ => false,
        }
    }

    /// Convert this outcome into the matched value, if there is one.
    pub fn into_match(self) -> Option<T> {
        match self {
            Outcome::Match(t) => Some(t),
            _ => None,
        }
    }

    /// Transform the matched value, if there is one.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Match(t) => Outcome::Match(f(t)),
            Outcome::NoMatch => Outcome::NoMatch,
            Outcome::DepthLimitExceeded => Outcome::DepthLimitExceeded,
        }
    }
}
