bitflags! {
    /// A set of options that control how a pattern is compiled.
    ///
    /// Flags are handed to the engine as is. The core matcher never inspects
    /// them beyond remembering which ones were used for the current pattern.
    ///
    /// Flags are combined with `|`:
    ///
    /// ```
    /// use rematch::Flags;
    ///
    /// let flags = Flags::CASELESS | Flags::MULTILINE;
    /// assert!(flags.contains(Flags::CASELESS));
    /// assert!(!flags.contains(Flags::UTF8));
    /// ```
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Flags: u32 {
        /// Case insensitive matching. Corresponds to the `i` flag.
        const CASELESS = 1 << 0;
        /// `^` and `$` also match at line boundaries. Corresponds to the
        /// `m` flag.
        const MULTILINE = 1 << 1;
        /// Treat the pattern and subjects as UTF-8 rather than as bytes.
        const UTF8 = 1 << 2;
        /// `.` matches `\n` too. Corresponds to the `s` flag.
        const DOTALL = 1 << 3;
        /// Ignore whitespace and `#` comments in the pattern. Corresponds
        /// to the `x` flag.
        const EXTENDED = 1 << 4;
        /// Use Unicode properties for `\d`, `\w` and friends. Implies
        /// `UTF8` for engines that need it.
        const UCP = 1 << 5;
    }
}

#[cfg(test)]
mod tests {
    use super::Flags;

    #[test]
    fn combine() {
        let mut flags = Flags::empty();
        assert!(flags.is_empty());
        flags |= Flags::UTF8;
        flags = flags | Flags::DOTALL;
        assert!(flags.contains(Flags::UTF8 | Flags::DOTALL));
        assert!(!flags.contains(Flags::UTF8 | Flags::CASELESS));
        assert_eq!(flags.bits(), Flags::UTF8.bits() | Flags::DOTALL.bits());
    }

    #[test]
    fn truncate_unknown_bits() {
        let flags = Flags::from_bits_truncate(0xFFFF_FFFF);
        assert!(flags.contains(Flags::UCP | Flags::CASELESS));
        assert_eq!(flags.bits(), (1 << 6) - 1);
    }

    #[test]
    fn debug() {
        assert_eq!(format!("{:?}", Flags::empty()), "Flags(0x0)");
        assert_eq!(
            format!("{:?}", Flags::MULTILINE | Flags::CASELESS),
            "Flags(CASELESS | MULTILINE)"
        );
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(Flags::default(), Flags::empty());
        assert_eq!(Flags::all().bits(), (1 << 6) - 1);
        assert_eq!(Flags::from_bits(1 << 6), None);
        assert_eq!(Flags::from_bits(1 << 2), Some(Flags::UTF8));
    }
}
