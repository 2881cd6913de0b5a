use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// An instrument symbol such as `APPL` or `TSLA`.
///
/// Symbols are opaque to the verifier: any non-empty token without
/// whitespace is accepted. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty instrument symbol".to_string());
        }
        if s.chars().any(char::is_whitespace) {
            return Err(format!("instrument symbol contains whitespace: `{}`", s));
        }
        Ok(Symbol(s.to_string()))
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
