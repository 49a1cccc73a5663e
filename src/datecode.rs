//! Date codes embedded in file names, and the bounds used to filter them.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A fixed-width numeric token such as `20140215`.
///
/// Kept in canonical string form: numbers are rendered in decimal, strings are
/// kept as given. Comparison is plain string comparison, which matches numeric
/// order as long as all codes share the same width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawDateCode", into = "String")]
pub struct DateCode(String);

impl DateCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DateCode {
    fn from(s: &str) -> Self {
        DateCode(s.to_owned())
    }
}
impl From<String> for DateCode {
    fn from(s: String) -> Self {
        DateCode(s)
    }
}
impl From<u32> for DateCode {
    fn from(n: u32) -> Self {
        DateCode(n.to_string())
    }
}
impl From<u64> for DateCode {
    fn from(n: u64) -> Self {
        DateCode(n.to_string())
    }
}
impl From<DateCode> for String {
    fn from(d: DateCode) -> Self {
        d.0
    }
}

// config files may carry bounds either as `20140215` or as `"20140215"`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDateCode {
    Number(u64),
    Text(String),
}

impl From<RawDateCode> for DateCode {
    fn from(raw: RawDateCode) -> Self {
        match raw {
            RawDateCode::Number(n) => n.into(),
            RawDateCode::Text(s) => s.into(),
        }
    }
}

/// Optional inclusive lower and upper date code. `None` means unbounded on that side.
///
/// `min <= max` is not checked; inverted bounds just match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub min: Option<DateCode>,
    pub max: Option<DateCode>,
}

impl DateBounds {
    pub fn new(min: Option<DateCode>, max: Option<DateCode>) -> Self {
        DateBounds { min, max }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.min.as_ref().map_or(true, |min| code >= min.as_str())
            && self.max.as_ref().map_or(true, |max| code <= max.as_str())
    }
}

/// How a date code is embedded in a file name: `<width digits><delimiter><rest>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameConvention {
    pub width: usize,
    pub delimiter: char,
}

impl Default for FilenameConvention {
    fn default() -> Self {
        FilenameConvention {
            width: 8,
            delimiter: '_',
        }
    }
}

/// Widest date code a [`FilenameConvention`] accepts.
pub const MAX_DATECODE_WIDTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConventionError {
    #[error("date code width must be between 1 and {max}, got {0}", max = MAX_DATECODE_WIDTH)]
    Width(usize),
    #[error("could not build file name pattern")]
    Pattern(#[from] regex::Error),
}

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = FilenameConvention::default()
        .to_regex()
        .expect("we know this regex compiles");
}

impl FilenameConvention {
    pub fn to_regex(&self) -> Result<Regex, ConventionError> {
        if self.width == 0 || self.width > MAX_DATECODE_WIDTH {
            return Err(ConventionError::Width(self.width));
        }
        let mut delim = [0u8; 4];
        Ok(Regex::new(&format!(
            "^([0-9]{{{}}}){}",
            self.width,
            regex::escape(self.delimiter.encode_utf8(&mut delim))
        ))?)
    }

    /// Returns a matcher for file names, reusing the compiled default where possible.
    pub fn matcher(&self) -> Result<DateCodeMatcher, ConventionError> {
        if *self == FilenameConvention::default() {
            Ok(DateCodeMatcher(DEFAULT_PATTERN.clone()))
        } else {
            Ok(DateCodeMatcher(self.to_regex()?))
        }
    }
}

pub struct DateCodeMatcher(Regex);

impl DateCodeMatcher {
    /// The leading date code of `filename`, or `None` if it does not follow the convention.
    pub fn extract<'a>(&self, filename: &'a str) -> Option<&'a str> {
        self.0
            .captures(filename)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}
