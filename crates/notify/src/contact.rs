//! Contact targets and notification channels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidTarget;

/// Minimum number of digits for a dialable number.
const MIN_DIGITS: usize = 3;
/// E.164 caps numbers at 15 digits.
const MAX_DIGITS: usize = 15;

/// A phone number that receives alerts.
///
/// Parsing strips common separators (spaces, dashes, dots, parentheses) and
/// keeps an optional leading `+`, so `"+1 (555) 010-0001"` and
/// `"+15550100001"` are the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactTarget(String);

impl ContactTarget {
    pub fn parse(value: &str) -> Result<Self, InvalidTarget> {
        let invalid = |reason| InvalidTarget {
            value: value.to_string(),
            reason,
        };

        let trimmed = value.trim();
        let (plus, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => ("+", rest),
            None => ("", trimmed),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(invalid("unexpected character")),
            }
        }

        if digits.len() < MIN_DIGITS {
            return Err(invalid("too few digits"));
        }
        if digits.len() > MAX_DIGITS {
            return Err(invalid("too many digits"));
        }

        Ok(Self(format!("{plus}{digits}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number with all but the last four digits hidden, for logs.
    #[must_use]
    pub fn redacted(&self) -> String {
        let visible = self.0.len().saturating_sub(4);
        let (hidden, tail) = self.0.split_at(visible);
        let stars: String = hidden
            .chars()
            .map(|c| if c == '+' { '+' } else { '*' })
            .collect();
        format!("{stars}{tail}")
    }
}

impl fmt::Display for ContactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContactTarget {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContactTarget {
    type Error = InvalidTarget;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContactTarget> for String {
    fn from(target: ContactTarget) -> Self {
        target.0
    }
}

/// One notification medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Voice call
    Call,
    /// Text message
    Sms,
}

impl Channel {
    /// Every channel attempted for each target in a round.
    pub const ALL: [Self; 2] = [Self::Call, Self::Sms];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
