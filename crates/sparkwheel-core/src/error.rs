//! Error types for sparkwheel
//!
//! Structured errors with the config identifier where the failure occurred,
//! an optional cause, and an actionable help message.

use std::fmt;

/// Result type alias for sparkwheel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sparkwheel operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Identifier in the config where the error occurred (e.g., "model::lr")
    pub id: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed identifier, override string, or YAML document
    Parse,
    /// Operator misuse or type mismatch while merging config layers
    Merge,
    /// Identifier not present in the graph; carries ranked suggestions
    KeyNotFound { suggestions: Vec<String> },
    /// Resolution cycle; carries the ordered participant list
    Cycle { participants: Vec<String> },
    /// Expression raised during evaluation
    Expression,
    /// Target location failed, or the component factory failed
    Instantiation,
    /// Schema validation failed (reported by external validators)
    Validation,
    /// I/O error (file not found, etc.)
    Io,
    /// Internal error (bug in sparkwheel)
    Internal,
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            id: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a merge error naming the offending key
    pub fn merge(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Merge,
            id: Some(key.into()),
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a key-not-found error with suggestions ranked by edit distance
    pub fn key_not_found(id: impl Into<String>, candidates: &[String]) -> Self {
        let id_str = id.into();
        let suggestions = rank_suggestions(&id_str, candidates);
        let help = if suggestions.is_empty() {
            format!("Check that '{}' exists in the configuration", id_str)
        } else {
            format!("Did you mean: {}?", suggestions.join(", "))
        };
        Self {
            kind: ErrorKind::KeyNotFound { suggestions },
            id: Some(id_str),
            help: Some(help),
            cause: None,
        }
    }

    /// Create a cycle error from the ordered participant list
    pub fn cycle(id: impl Into<String>, participants: Vec<String>) -> Self {
        let mut chain = participants.clone();
        if let Some(first) = participants.first() {
            chain.push(first.clone());
        }
        Self {
            kind: ErrorKind::Cycle { participants },
            id: Some(id.into()),
            help: Some("Break the cycle by removing one of the references".into()),
            cause: Some(format!("Chain: {}", chain.join(" -> "))),
        }
    }

    /// Create an expression error wrapping the underlying cause
    pub fn expression(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Expression,
            id: Some(id.into()),
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an instantiation error
    pub fn instantiation(id: impl Into<String>, message: impl Into<String>) -> Self {
        let i = id.into();
        Self {
            kind: ErrorKind::Instantiation,
            id: if i.is_empty() { None } else { Some(i) },
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a validation error
    pub fn validation(id: impl Into<String>, message: impl Into<String>) -> Self {
        let i = id.into();
        Self {
            kind: ErrorKind::Validation,
            id: if i.is_empty() { None } else { Some(i) },
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            id: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            id: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Add identifier context to the error
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Process exit code for tools embedding the engine
    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Instantiation => 3,
            ErrorKind::KeyNotFound { .. }
            | ErrorKind::Cycle { .. }
            | ErrorKind::Expression => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Merge => write!(f, "Merge error")?,
            ErrorKind::KeyNotFound { .. } => write!(f, "Identifier not found")?,
            ErrorKind::Cycle { .. } => write!(f, "Reference cycle detected")?,
            ErrorKind::Expression => write!(f, "Expression error")?,
            ErrorKind::Instantiation => write!(f, "Instantiation error")?,
            ErrorKind::Validation => write!(f, "Validation error")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(id) = &self.id {
            write!(f, "\n  Id: {}", id)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

/// Rank candidate identifiers by edit distance to `target`, closest first.
///
/// Candidates farther than max(2, len/3) edits are dropped; at most three
/// suggestions are returned.
pub(crate) fn rank_suggestions(target: &str, candidates: &[String]) -> Vec<String> {
    let threshold = (target.len() / 3).max(2);
    let mut ranked: Vec<(usize, &String)> = candidates
        .iter()
        .map(|c| (edit_distance(target, c), c))
        .filter(|(d, _)| *d <= threshold)
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    ranked.into_iter().take(3).map(|(_, c)| c.clone()).collect()
}

/// Levenshtein distance over characters
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
