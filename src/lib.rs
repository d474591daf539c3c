/*!
This crate provides a reusable regex matcher with a bounded backtracking
budget and pluggable memory allocation.

A [`Matcher`](struct.Matcher.html) compiles a pattern once, via
[`prepare`](struct.Matcher.html#method.prepare), and then searches byte
subjects with it as many times as needed. Every search reports an
[`Outcome`](enum.Outcome.html): a match, no match, or a search that was
abandoned because it exceeded the matcher's depth limit. The depth limit
protects callers against patterns and inputs that would otherwise backtrack
for an unbounded amount of time.

The default engine is [PCRE2](https://www.pcre.org/). Other engines can be
plugged in by implementing the [`Engine`](trait.Engine.html) trait.

# Example

```
extern crate rematch;

use rematch::{Flags, Matcher, Outcome, Span};

# fn main() { example().unwrap() }
fn example() -> Result<(), rematch::Error> {
    let mut matcher = Matcher::new();
    matcher.prepare(r"(?<year>\d{4})-(\d{2})", Flags::empty())?;

    let subject = b"released 2018-09";
    let mut spans = vec![];
    assert_eq!(
        matcher.captures_at(subject, 0, &mut spans),
        Outcome::Match(())
    );
    assert_eq!(
        spans,
        vec![Span::new(9, 7), Span::new(9, 4), Span::new(14, 2)]
    );
    assert_eq!(matcher.subpattern_index("year"), Some(1));

    assert_eq!(
        matcher.find_bytes_at(subject, 0),
        Outcome::Match(&b"2018-09"[..])
    );
    assert_eq!(matcher.is_match_at(b"no dates", 0), Outcome::NoMatch);
    Ok(())
}
```

# Depth limit

Each matcher is built with a depth limit, which either comes from
[`MatcherBuilder::depth_limit`](struct.MatcherBuilder.html#method.depth_limit)
or from the process wide default in effect when the matcher was built. The
default can be read and changed with
[`default_depth_limit`](fn.default_depth_limit.html) and
[`set_default_depth_limit`](fn.set_default_depth_limit.html).
*/

#![deny(missing_docs)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;
extern crate pcre2_sys;

pub use allocator::{Allocator, CountingAllocator, SystemAllocator};
pub use engine::{CompileFailure, Engine, Execution};
pub use error::{Error, ErrorKind};
pub use flags::Flags;
pub use limit::{
    default_depth_limit, set_default_depth_limit, DEFAULT_DEPTH_LIMIT,
};
pub use matcher::{Matcher, MatcherBuilder};
pub use outcome::{Outcome, Span};
pub use pcre2::{Pcre2, Pcre2Code, Pcre2MatchData};

mod allocator;
mod engine;
mod error;
mod flags;
mod limit;
mod matcher;
mod outcome;
mod pcre2;
