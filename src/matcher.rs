use std::fmt;

use allocator::{Allocator, SystemAllocator};
use engine::{Engine, Execution};
use error::Error;
use flags::Flags;
use limit;
use outcome::{Outcome, Span};
use pcre2::Pcre2;

static SYSTEM: SystemAllocator = SystemAllocator;

/// A builder for configuring a `Matcher`.
///
/// The only knob is the depth limit. When it isn't set, the matcher takes
/// the process wide default (see `set_default_depth_limit`) at the moment
/// `build` is called.
#[derive(Clone, Debug, Default)]
pub struct MatcherBuilder {
    depth_limit: Option<u32>,
}

impl MatcherBuilder {
    /// Create a new matcher builder with a default configuration.
    pub fn new() -> MatcherBuilder {
        MatcherBuilder { depth_limit: None }
    }

    /// Build an unprepared matcher backed by PCRE2, allocating from the
    /// global allocator.
    pub fn build(&self) -> Matcher<Pcre2<'static>> {
        self.build_with_allocator(&SYSTEM)
    }

    /// Build an unprepared matcher backed by PCRE2, allocating from the
    /// given allocator.
    ///
    /// The allocator is borrowed for as long as the matcher lives.
    pub fn build_with_allocator<'a>(
        &self,
        allocator: &'a dyn Allocator,
    ) -> Matcher<Pcre2<'a>> {
        self.build_with_engine(Pcre2::new(allocator))
    }

    /// Build an unprepared matcher backed by the given engine.
    pub fn build_with_engine<E: Engine>(&self, engine: E) -> Matcher<E> {
        let depth_limit =
            self.depth_limit.unwrap_or_else(limit::default_depth_limit);
        Matcher { state: State::Unprepared, engine, depth_limit }
    }

    /// Set the depth limit of the matcher.
    ///
    /// This bounds the amount of backtracking a single search may do. A
    /// search that needs more reports `Outcome::DepthLimitExceeded` instead
    /// of running on. For PCRE2, this is the match limit: the number of
    /// times its internal matching function may be entered per search.
    ///
    /// The limit is fixed for the life of the matcher.
    pub fn depth_limit(&mut self, limit: u32) -> &mut MatcherBuilder {
        self.depth_limit = Some(limit);
        self
    }
}

/// A regex that is compiled once and then searched with many times.
///
/// A matcher starts out unprepared. `prepare` compiles a pattern and puts
/// the matcher in the prepared state, after which any of the search methods
/// may be called as often as needed. Preparing again, or calling `clear`,
/// throws the compiled pattern away.
///
/// Each search method runs the same search and differs only in what it
/// reports about a match: nothing at all, the range of the overall match,
/// the matched bytes, or the ranges or bytes of every capturing group. All
/// of them return an `Outcome`, which tells a match apart from no match and
/// from a search that was abandoned at the depth limit.
///
/// Searches reuse a single capture buffer owned by the matcher, which is why
/// they take `&mut self`. To search from several threads at once, give each
/// thread its own matcher.
///
/// # Panics
///
/// Searching with an unprepared matcher, or with a start offset past the end
/// of the subject, panics.
pub struct Matcher<E: Engine = Pcre2<'static>> {
    state: State<E::Code, E::MatchData>,
    engine: E,
    depth_limit: u32,
}

/// A compiled pattern and its capture buffer always come and go together.
enum State<C, D> {
    Unprepared,
    Prepared(Prepared<C, D>),
}

struct Prepared<C, D> {
    pattern: String,
    flags: Flags,
    code: C,
    match_data: D,
}

impl Matcher<Pcre2<'static>> {
    /// Create a new unprepared matcher backed by PCRE2, using the global
    /// allocator and the default depth limit.
    pub fn new() -> Matcher<Pcre2<'static>> {
        MatcherBuilder::new().build()
    }
}

impl<'a> Matcher<Pcre2<'a>> {
    /// Create a new unprepared matcher backed by PCRE2, using the given
    /// allocator and the default depth limit.
    pub fn with_allocator(
        allocator: &'a dyn Allocator,
    ) -> Matcher<Pcre2<'a>> {
        MatcherBuilder::new().build_with_allocator(allocator)
    }

    /// Return the allocator this matcher allocates from.
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.engine.allocator()
    }
}

impl<E: Engine> Matcher<E> {
    /// Create a new unprepared matcher backed by the given engine, using
    /// the default depth limit.
    pub fn with_engine(engine: E) -> Matcher<E> {
        MatcherBuilder::new().build_with_engine(engine)
    }

    /// Compile `pattern` with the given flags and prepare this matcher to
    /// search with it.
    ///
    /// Whatever pattern this matcher held before is discarded first, even
    /// if the new one fails to compile. On failure, the matcher is left
    /// unprepared and the error carries the engine's diagnostic along with
    /// the offset in `pattern` where compilation failed.
    pub fn prepare(
        &mut self,
        pattern: &str,
        flags: Flags,
    ) -> Result<(), Error> {
        self.clear();

        let code = match self.engine.compile(pattern, flags) {
            Ok(code) => code,
            Err(failure) => {
                let msg = self.engine.error_message(failure.code);
                let err = Error::regex(msg, failure.offset);
                debug!("failed to compile {:?}: {}", pattern, err);
                return Err(err);
            }
        };
        let match_data = match self.engine.match_data(&code) {
            Some(match_data) => match_data,
            None => {
                debug!("no memory for capture buffer of {:?}", pattern);
                return Err(Error::out_of_memory());
            }
        };
        trace!("prepared {:?} with {:?}", pattern, flags);
        self.state = State::Prepared(Prepared {
            pattern: pattern.to_string(),
            flags,
            code,
            match_data,
        });
        Ok(())
    }

    /// Discard the compiled pattern, if any, and return to the unprepared
    /// state.
    ///
    /// This does nothing if the matcher is already unprepared.
    pub fn clear(&mut self) {
        self.state = State::Unprepared;
    }

    /// Returns true if and only if this matcher holds a compiled pattern.
    pub fn is_prepared(&self) -> bool {
        match self.state {
            State::Prepared(_) => true,
            State::Unprepared => false,
        }
    }

    /// Return the pattern this matcher was prepared with.
    ///
    /// This is empty when the matcher is unprepared.
    pub fn pattern(&self) -> &str {
        match self.state {
            State::Prepared(ref prepared) => &prepared.pattern,
            State::Unprepared => "",
        }
    }

    /// Return the flags this matcher was prepared with.
    ///
    /// This is empty when the matcher is unprepared.
    pub fn flags(&self) -> Flags {
        match self.state {
            State::Prepared(ref prepared) => prepared.flags,
            State::Unprepared => Flags::empty(),
        }
    }

    /// Return the depth limit applied to every search.
    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    /// Return the engine backing this matcher.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Return the number of capturing groups in the prepared pattern.
    ///
    /// The implicit group for the overall match is not counted.
    ///
    /// # Panics
    ///
    /// This panics if the matcher is unprepared.
    pub fn num_subpatterns(&self) -> usize {
        self.engine.capture_count(&self.prepared().code)
    }

    /// Return the index of the capturing group with the given name.
    ///
    /// `None` is returned when the prepared pattern has no group by that
    /// name. It is also returned when the engine resolves the name to an
    /// index that isn't in `1..=num_subpatterns()`.
    ///
    /// # Panics
    ///
    /// This panics if the matcher is unprepared.
    pub fn subpattern_index(&self, name: &str) -> Option<usize> {
        let code = &self.prepared().code;
        match self.engine.name_to_index(code, name) {
            Some(i) if 1 <= i && i <= self.engine.capture_count(code) => {
                Some(i)
            }
            _ => None,
        }
    }

    /// Search `subject` starting at `start` and report only whether a match
    /// was found.
    pub fn is_match_at(
        &mut self,
        subject: &[u8],
        start: usize,
    ) -> Outcome<()> {
        self.search(subject, start).map(|_| ())
    }

    /// Search `subject` starting at `start` and report the range of the
    /// overall match.
    ///
    /// Offsets are always relative to the beginning of `subject`, not to
    /// `start`.
    pub fn find_at(
        &mut self,
        subject: &[u8],
        start: usize,
    ) -> Outcome<Span> {
        self.search(subject, start).map(|groups| groups.overall().span())
    }

    /// Search `subject` starting at `start` and report the bytes of the
    /// overall match.
    ///
    /// An empty match yields an empty slice that does not point into
    /// `subject`.
    pub fn find_bytes_at<'s>(
        &mut self,
        subject: &'s [u8],
        start: usize,
    ) -> Outcome<&'s [u8]> {
        self.search(subject, start)
            .map(|groups| groups.overall().bytes(subject))
    }

    /// Search `subject` starting at `start` and write the range of the
    /// overall match followed by the range of every capturing group into
    /// `spans`.
    ///
    /// On a match, `spans` is resized to `num_subpatterns() + 1`. Groups that
    /// did not participate in the match are reported as `Span::UNSET`.
    /// Otherwise, `spans` is left untouched.
    pub fn captures_at(
        &mut self,
        subject: &[u8],
        start: usize,
        spans: &mut Vec<Span>,
    ) -> Outcome<()> {
        self.search(subject, start).map(|groups| {
            spans.clear();
            spans.extend(groups.iter().map(|g| g.span()));
        })
    }

    /// Search `subject` starting at `start` and write the bytes of the
    /// overall match followed by the bytes of every capturing group into
    /// `matches`.
    ///
    /// On a match, `matches` is resized to `num_subpatterns() + 1`. Groups
    /// that matched the empty string or did not participate in the match
    /// both yield an empty slice that does not point into `subject`.
    /// Otherwise, `matches` is left untouched.
    pub fn captures_bytes_at<'s>(
        &mut self,
        subject: &'s [u8],
        start: usize,
        matches: &mut Vec<&'s [u8]>,
    ) -> Outcome<()> {
        self.search(subject, start).map(|groups| {
            matches.clear();
            matches.extend(groups.iter().map(|g| g.bytes(subject)));
        })
    }

    fn prepared(&self) -> &Prepared<E::Code, E::MatchData> {
        match self.state {
            State::Prepared(ref prepared) => prepared,
            State::Unprepared => panic!("matcher has no prepared pattern"),
        }
    }

    /// Run the prepared pattern against `subject` and, on a match, hand
    /// back the decoded capture buffer.
    fn search(
        &mut self,
        subject: &[u8],
        start: usize,
    ) -> Outcome<Groups<'_>> {
        assert!(
            start <= subject.len(),
            "start offset {} is past the end of a subject of length {}",
            start,
            subject.len()
        );
        let prepared = match self.state {
            State::Prepared(ref mut prepared) => prepared,
            State::Unprepared => panic!("matcher has no prepared pattern"),
        };
        let exec = self.engine.execute(
            &prepared.code,
            subject,
            start,
            &mut prepared.match_data,
            self.depth_limit,
        );
        match exec {
            Execution::Matched(set) => {
                trace!(
                    "{:?}: match from offset {}, {} groups set",
                    prepared.pattern,
                    start,
                    set
                );
            }
            Execution::NoMatch => return Outcome::NoMatch,
            Execution::DepthLimitExceeded => {
                debug!(
                    "{:?}: depth limit of {} exceeded",
                    prepared.pattern, self.depth_limit
                );
                return Outcome::DepthLimitExceeded;
            }
            Execution::Error(code) => {
                debug!(
                    "{:?}: search failed with code {}: {}",
                    prepared.pattern,
                    code,
                    self.engine.error_message(code)
                );
                return Outcome::NoMatch;
            }
        }
        let ovector = self.engine.ovector(&prepared.match_data);
        debug_assert!(ovector.len() >= 2 && ovector.len() % 2 == 0);
        Outcome::Match(Groups { ovector, unset: E::UNSET })
    }
}

impl<E: Engine> Drop for Matcher<E> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<E: Engine> fmt::Debug for Matcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("pattern", &self.pattern())
            .field("flags", &self.flags())
            .field("prepared", &self.is_prepared())
            .field("depth_limit", &self.depth_limit)
            .finish()
    }
}

/// The capture buffer of a successful search.
struct Groups<'d> {
    ovector: &'d [usize],
    unset: usize,
}

impl<'d> Groups<'d> {
    /// The overall match, which always participates.
    fn overall(&self) -> Group {
        Group::decode(self.ovector[0], self.ovector[1], self.unset)
    }

    fn iter(&self) -> impl Iterator<Item = Group> + 'd {
        let unset = self.unset;
        self.ovector
            .chunks(2)
            .map(move |pair| Group::decode(pair[0], pair[1], unset))
    }
}

/// One decoded pair of the capture buffer.
///
/// Whether a group participated is tracked on its own, so the engine's
/// sentinel offset never takes part in any arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Group {
    offset: usize,
    length: usize,
    participated: bool,
}

impl Group {
    fn decode(start: usize, end: usize, unset: usize) -> Group {
        if start == unset {
            return Group { offset: 0, length: 0, participated: false };
        }
        // `\K` inside a lookaround can leave a group ending before it
        // starts. Such a group is reported as empty.
        Group {
            offset: start,
            length: end.saturating_sub(start),
            participated: true,
        }
    }

    fn span(&self) -> Span {
        if self.participated {
            Span::new(self.offset, self.length)
        } else {
            Span::UNSET
        }
    }

    fn bytes<'s>(&self, subject: &'s [u8]) -> &'s [u8] {
        if !self.participated || self.length == 0 {
            return &[];
        }
        &subject[self.offset..self.offset + self.length]
    }
}
