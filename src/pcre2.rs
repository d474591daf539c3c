use std::ffi::{c_void, CString};
use std::fmt;
use std::slice;
use std::sync::Arc;
use std::usize;

use pcre2_sys::*;

use allocator::Allocator;
use engine::{CompileFailure, Engine, Execution};
use flags::Flags;

/// PCRE2 writes this into both halves of an ovector pair for groups that
/// did not participate in a match.
const PCRE2_UNSET_OFFSET: usize = usize::MAX;

/// The size of the buffer PCRE2 error messages are formatted into. Longer
/// messages are truncated.
const ERROR_BUFFER_SIZE: usize = 256;

/// The allocator as seen from inside PCRE2.
///
/// PCRE2 copies the `memory_data` pointer of the general context into every
/// context, compiled pattern and match data block created from it, and
/// calls back into us with it whenever it allocates or frees. Each of those
/// holds an `Arc` to this, so the pointer stays valid until the last of them
/// is freed.
struct Memory<'a> {
    allocator: &'a dyn Allocator,
}

impl<'a> Memory<'a> {
    fn as_ptr(&self) -> *mut c_void {
        self as *const Memory as *mut c_void
    }
}

unsafe extern "C" fn private_malloc(
    size: usize,
    data: *mut c_void,
) -> *mut c_void {
    let memory = &*(data as *const Memory);
    memory.allocator.allocate(size) as *mut c_void
}

unsafe extern "C" fn private_free(ptr: *mut c_void, data: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let memory = &*(data as *const Memory);
    memory.allocator.deallocate(ptr as *mut u8);
}

/// A regex engine backed by PCRE2.
///
/// All memory PCRE2 needs is taken from the allocator given to `Pcre2::new`.
/// The depth limit handed to `execute` is applied as PCRE2's match limit,
/// so a search that runs out of it reports
/// `Execution::DepthLimitExceeded`.
pub struct Pcre2<'a> {
    memory: Arc<Memory<'a>>,
    general: *mut pcre2_general_context_8,
    compile: *mut pcre2_compile_context_8,
    matching: *mut pcre2_match_context_8,
}

// The contexts are only ever touched through `&self` in `execute`, where the
// match limit is written, and a matcher only executes through `&mut self`.
// Moving the whole engine to another thread is fine. Sharing it is not.
unsafe impl<'a> Send for Pcre2<'a> {}

impl<'a> Pcre2<'a> {
    /// Create a new PCRE2 engine whose memory comes from `allocator`.
    ///
    /// # Panics
    ///
    /// This panics if the allocator cannot provide memory for PCRE2's
    /// contexts.
    pub fn new(allocator: &'a dyn Allocator) -> Pcre2<'a> {
        let memory = Arc::new(Memory { allocator });
        let general = unsafe {
            pcre2_general_context_create_8(
                Some(private_malloc),
                Some(private_free),
                memory.as_ptr(),
            )
        };
        assert!(
            !general.is_null(),
            "failed to allocate PCRE2 general context"
        );
        // From here on, dropping the engine frees whatever contexts exist.
        let mut engine = Pcre2 {
            memory,
            general,
            compile: ::std::ptr::null_mut(),
            matching: ::std::ptr::null_mut(),
        };
        engine.compile = unsafe { pcre2_compile_context_create_8(general) };
        assert!(
            !engine.compile.is_null(),
            "failed to allocate PCRE2 compile context"
        );
        engine.matching = unsafe { pcre2_match_context_create_8(general) };
        assert!(
            !engine.matching.is_null(),
            "failed to allocate PCRE2 match context"
        );
        engine
    }

    /// Return the allocator this engine takes its memory from.
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.memory.allocator
    }
}

impl<'a> Drop for Pcre2<'a> {
    fn drop(&mut self) {
        unsafe {
            if !self.matching.is_null() {
                pcre2_match_context_free_8(self.matching);
            }
            if !self.compile.is_null() {
                pcre2_compile_context_free_8(self.compile);
            }
            pcre2_general_context_free_8(self.general);
        }
    }
}

impl<'a> fmt::Debug for Pcre2<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pcre2").finish()
    }
}

/// A pattern compiled by `Pcre2`.
pub struct Pcre2Code<'a> {
    code: *mut pcre2_code_8,
    _memory: Arc<Memory<'a>>,
}

// PCRE2 never mutates a compiled pattern once it has been created.
unsafe impl<'a> Send for Pcre2Code<'a> {}
unsafe impl<'a> Sync for Pcre2Code<'a> {}

impl<'a> Drop for Pcre2Code<'a> {
    fn drop(&mut self) {
        unsafe { pcre2_code_free_8(self.code) }
    }
}

impl<'a> fmt::Debug for Pcre2Code<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pcre2Code").finish()
    }
}

/// A PCRE2 match data block, holding the ovector of the last search.
pub struct Pcre2MatchData<'a> {
    data: *mut pcre2_match_data_8,
    _memory: Arc<Memory<'a>>,
}

unsafe impl<'a> Send for Pcre2MatchData<'a> {}

impl<'a> Drop for Pcre2MatchData<'a> {
    fn drop(&mut self) {
        unsafe { pcre2_match_data_free_8(self.data) }
    }
}

impl<'a> fmt::Debug for Pcre2MatchData<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pcre2MatchData").finish()
    }
}

impl<'a> Engine for Pcre2<'a> {
    type Code = Pcre2Code<'a>;
    type MatchData = Pcre2MatchData<'a>;

    const UNSET: usize = PCRE2_UNSET_OFFSET;

    fn compile(
        &self,
        pattern: &str,
        flags: Flags,
    ) -> Result<Pcre2Code<'a>, CompileFailure> {
        let mut error_code: i32 = 0;
        let mut error_offset: usize = 0;
        let code = unsafe {
            pcre2_compile_8(
                pattern.as_ptr(),
                pattern.len(),
                options(flags),
                &mut error_code,
                &mut error_offset,
                self.compile,
            )
        };
        if code.is_null() {
            return Err(CompileFailure {
                code: error_code,
                offset: error_offset,
            });
        }
        Ok(Pcre2Code { code, _memory: self.memory.clone() })
    }

    fn match_data(&self, code: &Pcre2Code<'a>) -> Option<Pcre2MatchData<'a>> {
        let data = unsafe {
            pcre2_match_data_create_from_pattern_8(code.code, self.general)
        };
        if data.is_null() {
            return None;
        }
        Some(Pcre2MatchData { data, _memory: self.memory.clone() })
    }

    fn execute(
        &self,
        code: &Pcre2Code<'a>,
        subject: &[u8],
        start: usize,
        match_data: &mut Pcre2MatchData<'a>,
        depth_limit: u32,
    ) -> Execution {
        // An empty slice may have a dangling pointer, but PCRE2 never reads
        // through it when the length is zero.
        let rc = unsafe {
            pcre2_set_match_limit_8(self.matching, depth_limit);
            pcre2_match_8(
                code.code,
                subject.as_ptr(),
                subject.len(),
                start,
                0,
                match_data.data,
                self.matching,
            )
        };
        if rc == PCRE2_ERROR_NOMATCH {
            Execution::NoMatch
        } else if rc == PCRE2_ERROR_MATCHLIMIT {
            Execution::DepthLimitExceeded
        } else if rc < 0 {
            Execution::Error(rc)
        } else if rc == 0 {
            // The ovector was too small to hold every pair. It is sized
            // from the pattern, so this means every pair was set.
            Execution::Matched(self.ovector(match_data).len() / 2)
        } else {
            Execution::Matched(rc as usize)
        }
    }

    fn ovector<'d>(&self, match_data: &'d Pcre2MatchData<'a>) -> &'d [usize] {
        unsafe {
            let ptr = pcre2_get_ovector_pointer_8(match_data.data);
            let pairs = pcre2_get_ovector_count_8(match_data.data) as usize;
            slice::from_raw_parts(ptr as *const usize, pairs * 2)
        }
    }

    fn capture_count(&self, code: &Pcre2Code<'a>) -> usize {
        let mut count: u32 = 0;
        let rc = unsafe {
            pcre2_pattern_info_8(
                code.code,
                PCRE2_INFO_CAPTURECOUNT,
                &mut count as *mut u32 as *mut c_void,
            )
        };
        assert_eq!(rc, 0, "PCRE2 capture count is always available");
        count as usize
    }

    fn name_to_index(
        &self,
        code: &Pcre2Code<'a>,
        name: &str,
    ) -> Option<usize> {
        let name = match CString::new(name) {
            Err(_) => return None,
            Ok(name) => name,
        };
        let rc = unsafe {
            pcre2_substring_number_from_name_8(
                code.code,
                name.as_ptr() as *const u8,
            )
        };
        if rc < 0 {
            None
        } else {
            Some(rc as usize)
        }
    }

    fn error_message(&self, code: i32) -> String {
        let mut buf = [0u8; ERROR_BUFFER_SIZE];
        let rc = unsafe {
            pcre2_get_error_message_8(code, buf.as_mut_ptr(), buf.len())
        };
        if rc <= 0 {
            return String::new();
        }
        String::from_utf8_lossy(&buf[..rc as usize]).into_owned()
    }
}

/// Translate our flags into PCRE2 compile options.
fn options(flags: Flags) -> u32 {
    let mut options = 0;
    if flags.contains(Flags::CASELESS) {
        options |= PCRE2_CASELESS;
    }
    if flags.contains(Flags::MULTILINE) {
        options |= PCRE2_MULTILINE;
    }
    if flags.contains(Flags::UTF8) {
        options |= PCRE2_UTF;
    }
    if flags.contains(Flags::DOTALL) {
        options |= PCRE2_DOTALL;
    }
    if flags.contains(Flags::EXTENDED) {
        options |= PCRE2_EXTENDED;
    }
    if flags.contains(Flags::UCP) {
        // PCRE2 only honors Unicode properties in UTF mode.
        options |= PCRE2_UCP | PCRE2_UTF;
    }
    options
}

#[cfg(test)]
mod tests {
    use allocator::{CountingAllocator, SystemAllocator};
    use engine::{Engine, Execution};
    use flags::Flags;
    use super::{options, Pcre2};

    use pcre2_sys::*;

    #[test]
    fn flags_to_options() {
        assert_eq!(options(Flags::empty()), 0);
        assert_eq!(
            options(Flags::CASELESS | Flags::MULTILINE),
            PCRE2_CASELESS | PCRE2_MULTILINE
        );
        assert_eq!(options(Flags::UCP), PCRE2_UCP | PCRE2_UTF);
    }

    #[test]
    fn compile_and_execute() {
        let engine = Pcre2::new(&SystemAllocator);
        let code = engine.compile(r"(\w+)@(\w+)", Flags::empty()).unwrap();
        assert_eq!(engine.capture_count(&code), 2);

        let mut data = engine.match_data(&code).unwrap();
        assert_eq!(engine.ovector(&data).len(), 6);

        let exec = engine.execute(&code, b"mail bob@home", 0, &mut data, 1000);
        assert_eq!(exec, Execution::Matched(3));
        assert_eq!(engine.ovector(&data), &[5, 13, 5, 8, 9, 13]);

        let exec = engine.execute(&code, b"nobody", 0, &mut data, 1000);
        assert_eq!(exec, Execution::NoMatch);
    }

    #[test]
    fn compile_failure_has_message() {
        let engine = Pcre2::new(&SystemAllocator);
        let failure = engine.compile("a(", Flags::empty()).unwrap_err();
        assert_eq!(failure.offset, 2);
        assert!(!engine.error_message(failure.code).is_empty());
    }

    #[test]
    fn unknown_error_code_has_no_message() {
        let engine = Pcre2::new(&SystemAllocator);
        assert_eq!(engine.error_message(1_000_000), "");
    }

    #[test]
    fn names() {
        let engine = Pcre2::new(&SystemAllocator);
        let code = engine.compile(r"(?<x>a)(?<y>b)", Flags::empty()).unwrap();
        assert_eq!(engine.name_to_index(&code, "x"), Some(1));
        assert_eq!(engine.name_to_index(&code, "y"), Some(2));
        assert_eq!(engine.name_to_index(&code, "z"), None);
        assert_eq!(engine.name_to_index(&code, "x\0"), None);
    }

    #[test]
    fn memory_comes_from_allocator() {
        let alloc = CountingAllocator::new();
        {
            let engine = Pcre2::new(&alloc);
            let contexts = alloc.blocks_in_use();
            assert!(contexts > 0);
            {
                let code = engine.compile("a+b", Flags::empty()).unwrap();
                let _data = engine.match_data(&code).unwrap();
                assert!(alloc.blocks_in_use() > contexts);
            }
            assert_eq!(alloc.blocks_in_use(), contexts);
        }
        assert_eq!(alloc.blocks_in_use(), 0);
        assert_eq!(alloc.bytes_in_use(), 0);
    }
}
