use std::fmt;

/// HTTP protocol version as it appears on the wire (`HTTP/<major>.<minor>`).
///
/// Ordering compares the major number first, then the minor number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parses `HTTP/<major>.<minor>`.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::version::Version;
    /// assert_eq!(Version::parse("HTTP/1.1"), Some(Version::HTTP_11));
    /// assert_eq!(Version::parse("HTTP/1"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let numbers = s.strip_prefix("HTTP/")?;
        let (major, minor) = numbers.split_once('.')?;

        Some(Self {
            major: parse_digits(major)?,
            minor: parse_digits(minor)?,
        })
    }
}

// `u8::from_str` accepts a leading `+`; the wire format does not.
fn parse_digits(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Default for Version {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
