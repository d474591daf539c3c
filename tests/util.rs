use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::usize;

use regex::bytes::{CaptureLocations, Regex, RegexBuilder};
use rematch::{CompileFailure, Engine, Execution, Flags};

pub const UNSET: usize = usize::MAX;

/// The error code `RegexEngine` reports for searches told to fail.
pub const SEARCH_FAILED: i32 = -99;

/// An engine built on the regex crate, for testing the matcher without
/// PCRE2.
///
/// Its notion of effort is simple: a search from offset `start` costs
/// `subject.len() - start + 1` steps, and fails with a depth limit error if
/// that is more than the limit. It can also be told to fail in the ways a
/// real engine can.
#[derive(Debug, Default)]
pub struct RegexEngine {
    errors: RefCell<Vec<String>>,
    live: Rc<Cell<usize>>,
    /// When set, allocating a capture buffer fails.
    pub fail_match_data: Cell<bool>,
    /// When set, every search fails with `SEARCH_FAILED`.
    pub fail_search: Cell<bool>,
    /// Names that resolve to these indices no matter what the pattern says.
    pub name_overrides: RefCell<HashMap<String, usize>>,
}

impl RegexEngine {
    pub fn new() -> RegexEngine {
        RegexEngine::default()
    }

    /// A shared count of compiled patterns and capture buffers that are
    /// currently alive.
    pub fn live(&self) -> Rc<Cell<usize>> {
        self.live.clone()
    }

    fn track(&self) -> Live {
        self.live.set(self.live.get() + 1);
        Live(self.live.clone())
    }
}

#[derive(Debug)]
struct Live(Rc<Cell<usize>>);

impl Drop for Live {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[derive(Debug)]
pub struct RegexCode {
    re: Regex,
    names: HashMap<String, usize>,
    _live: Live,
}

#[derive(Debug)]
pub struct RegexMatchData {
    locs: CaptureLocations,
    ovector: Vec<usize>,
    _live: Live,
}

impl Engine for RegexEngine {
    type Code = RegexCode;
    type MatchData = RegexMatchData;

    const UNSET: usize = usize::MAX;

    fn compile(
        &self,
        pattern: &str,
        flags: Flags,
    ) -> Result<RegexCode, CompileFailure> {
        let result = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains(Flags::CASELESS))
            .multi_line(flags.contains(Flags::MULTILINE))
            .dot_matches_new_line(flags.contains(Flags::DOTALL))
            .ignore_whitespace(flags.contains(Flags::EXTENDED))
            .build();
        let re = match result {
            Ok(re) => re,
            Err(err) => {
                let mut errors = self.errors.borrow_mut();
                errors.push(err.to_string());
                return Err(CompileFailure {
                    code: errors.len() as i32,
                    offset: pattern.len(),
                });
            }
        };
        let mut names = HashMap::new();
        for (i, optional_name) in re.capture_names().enumerate() {
            if let Some(name) = optional_name {
                names.insert(name.to_string(), i);
            }
        }
        Ok(RegexCode { re, names, _live: self.track() })
    }

    fn match_data(&self, code: &RegexCode) -> Option<RegexMatchData> {
        if self.fail_match_data.get() {
            return None;
        }
        Some(RegexMatchData {
            locs: code.re.capture_locations(),
            ovector: vec![UNSET; 2 * code.re.captures_len()],
            _live: self.track(),
        })
    }

    fn execute(
        &self,
        code: &RegexCode,
        subject: &[u8],
        start: usize,
        match_data: &mut RegexMatchData,
        depth_limit: u32,
    ) -> Execution {
        if self.fail_search.get() {
            return Execution::Error(SEARCH_FAILED);
        }
        let steps = (subject.len() - start) as u64 + 1;
        if steps > depth_limit as u64 {
            return Execution::DepthLimitExceeded;
        }
        let data = match_data;
        if code.re.captures_read_at(&mut data.locs, subject, start).is_none() {
            return Execution::NoMatch;
        }
        let mut set = 0;
        for i in 0..data.locs.len() {
            let (s, e) = match data.locs.get(i) {
                None => (UNSET, UNSET),
                Some(pos) => {
                    set = i + 1;
                    pos
                }
            };
            data.ovector[2 * i] = s;
            data.ovector[2 * i + 1] = e;
        }
        Execution::Matched(set)
    }

    fn ovector<'d>(&self, match_data: &'d RegexMatchData) -> &'d [usize] {
        &match_data.ovector
    }

    fn capture_count(&self, code: &RegexCode) -> usize {
        code.re.captures_len() - 1
    }

    fn name_to_index(&self, code: &RegexCode, name: &str) -> Option<usize> {
        if let Some(&i) = self.name_overrides.borrow().get(name) {
            return Some(i);
        }
        code.names.get(name).map(|i| *i)
    }

    fn error_message(&self, code: i32) -> String {
        if code == SEARCH_FAILED {
            return "search failed".to_string();
        }
        if code < 1 {
            return String::new();
        }
        self.errors
            .borrow()
            .get(code as usize - 1)
            .cloned()
            .unwrap_or_else(String::new)
    }
}
