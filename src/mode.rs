//! Unix permission bits as exchanged with the remote.
//!
//! `Mode` only ever holds the permission part of a file mode
//! (`0..=0o7777`); the file-type bits a server reports alongside it are
//! stripped by [`Mode::from_raw`].

use std::fmt;
use std::str::FromStr;

/// Errors from parsing a permission string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("permission string is empty")]
    Empty,
    #[error("invalid octal digit '{digit}' in permission string '{input}'")]
    InvalidDigit { digit: char, input: String },
    #[error("permission string '{0}' has more than 4 octal digits")]
    TooLong(String),
}

/// Permission bits: owner/group/other plus setuid, setgid and sticky
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    /// All bits a `Mode` may carry
    pub const MASK: u32 = 0o7777;

    const MAX_DIGITS: usize = 4;

    /// Keep the permission bits of a raw `st_mode`, dropping the file type
    pub fn from_raw(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if setuid, setgid or sticky is set
    pub fn has_special_bits(self) -> bool {
        self.0 & 0o7000 != 0
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ModeError::Empty);
        }
        if let Some(digit) = s.chars().find(|c| !('0'..='7').contains(c)) {
            return Err(ModeError::InvalidDigit {
                digit,
                input: s.to_string(),
            });
        }
        if s.len() > Self::MAX_DIGITS {
            return Err(ModeError::TooLong(s.to_string()));
        }

        // Only octal digits remain and at most four of them, so this fits.
        let bits = s.chars().fold(0u32, |acc, c| acc * 8 + (c as u32 - '0' as u32));
        Ok(Self(bits))
    }
}

/// Three digits (`644`), or four when a special bit is set (`4755`)
impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_special_bits() {
            write!(f, "{:04o}", self.0)
        } else {
            write!(f, "{:03o}", self.0)
        }
    }
}
