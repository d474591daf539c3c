use flags::Flags;

/// The interface a regex engine must provide to back a `Matcher`.
///
/// An engine is a capability: it knows how to compile patterns, how to
/// allocate an output buffer for a compiled pattern, and how to execute a
/// compiled pattern against a subject. It does not keep track of any of
/// this state itself. The matcher owns every compiled pattern and buffer the
/// engine hands out, and releases them by dropping them.
///
/// After a successful execution, the output buffer holds one pair of
/// offsets per capturing group plus one for the overall match. Pair `0` is
/// the overall match. Pair `i` is the `i`th capturing group, counted by
/// opening parenthesis from left to right. A group that did not take part
/// in the match has both offsets set to `UNSET`.
pub trait Engine {
    /// A compiled pattern.
    type Code;
    /// A capture output buffer, sized for one particular compiled pattern.
    type MatchData;

    /// The offset this engine writes into both halves of a pair when the
    /// corresponding group did not participate in a match.
    const UNSET: usize;

    /// Compile the given pattern with the given flags.
    fn compile(
        &self,
        pattern: &str,
        flags: Flags,
    ) -> Result<Self::Code, CompileFailure>;

    /// Allocate an output buffer large enough for every capturing group in
    /// `code`, plus the overall match.
    ///
    /// Returns `None` when the buffer could not be allocated.
    fn match_data(&self, code: &Self::Code) -> Option<Self::MatchData>;

    /// Search `subject`, starting at `start`, for the first match of `code`.
    ///
    /// `depth_limit` bounds how much backtracking the engine may do before
    /// it gives up with `Execution::DepthLimitExceeded`. Callers guarantee
    /// that `start <= subject.len()` and that `match_data` was created for
    /// `code`.
    fn execute(
        &self,
        code: &Self::Code,
        subject: &[u8],
        start: usize,
        match_data: &mut Self::MatchData,
        depth_limit: u32,
    ) -> Execution;

    /// Return the flat output vector of `match_data`: `start, end` pairs,
    /// one for the overall match followed by one per capturing group.
    fn ovector<'d>(&self, match_data: &'d Self::MatchData) -> &'d [usize];

    /// Return the number of capturing groups in `code`, not counting the
    /// implicit group for the overall match.
    fn capture_count(&self, code: &Self::Code) -> usize;

    /// Resolve a group name through the name table of `code`.
    fn name_to_index(&self, code: &Self::Code, name: &str) -> Option<usize>;

    /// Describe an error code returned by `compile` or `execute`.
    ///
    /// Engines that cannot describe a code return an empty string.
    fn error_message(&self, code: i32) -> String;
}

/// Why and where an engine refused to compile a pattern.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompileFailure {
    /// The engine specific error code. Pass this to
    /// `Engine::error_message` for a description.
    pub code: i32,
    /// The byte offset in the pattern at which compilation failed.
    pub offset: usize,
}

/// The result of running a compiled pattern against a subject.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Execution {
    /// A match was found. The output buffer was updated, and this many
    /// leading pairs in it were set by the match.
    Matched(usize),
    /// The search completed without finding a match.
    NoMatch,
    /// The search was abandoned because it exceeded the depth limit.
    DepthLimitExceeded,
    /// The search failed for some other reason, such as an invalid UTF-8
    /// subject in UTF mode. The engine specific error code is included.
    Error(i32),
}
