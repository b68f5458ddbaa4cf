// crates/manifest-gate-core/src/core/version.rs
// ============================================================================
// Module: Version Requirements
// Description: Package-style versions and requirement expressions.
// Purpose: Compare runtime and package versions with requirement semantics.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Versions are dot-separated segments; numeric segments compare numerically,
//! alphabetic segments mark pre-releases and sort below any number, and
//! trailing zero segments are insignificant (`2.7 == 2.7.0`).
//!
//! Requirements are comma-separated conjunctions of `op version` pairs where
//! `op` is one of `=`, `!=`, `>`, `<`, `>=`, `<=`, or `~>`. A bare version
//! means `=`. `~> 2.7.1` accepts `>= 2.7.1, < 2.8`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Version and requirement parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Version string is not well-formed.
    #[error("Malformed version number string {0}")]
    MalformedVersion(String),
    /// Requirement string is not well-formed.
    #[error("Illformed requirement [\"{0}\"]")]
    IllformedRequirement(String),
}

// ============================================================================
// SECTION: Version
// ============================================================================

/// One version segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Numeric segment.
    Number(u64),
    /// Alphabetic (pre-release) segment.
    Text(String),
}

impl Segment {
    /// Compares two segments; numbers sort above text.
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Greater,
            (Self::Text(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

/// Parsed package version.
#[derive(Debug, Clone)]
pub struct Version {
    /// Version as written.
    raw: String,
    /// Segments with trailing zero segments removed.
    segments: Vec<Segment>,
}

impl Version {
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::MalformedVersion`] unless the input is a
    /// digit-led run of alphanumeric segments separated by `.` (a `-` starts
    /// a pre-release suffix).
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let malformed = || VersionError::MalformedVersion(format!("\"{input}\""));
        if !raw.as_bytes().first().is_some_and(u8::is_ascii_digit) {
            return Err(malformed());
        }
        let normalized = raw.replacen('-', ".pre.", 1);
        let mut segments = Vec::new();
        for part in normalized.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
                return Err(malformed());
            }
            split_segment(part, &mut segments).ok_or_else(malformed)?;
        }
        while segments.len() > 1 && segments.last() == Some(&Segment::Number(0)) {
            segments.pop();
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the version as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true when any segment is alphabetic.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.segments.iter().any(|segment| matches!(segment, Segment::Text(_)))
    }

    /// Returns the upper bound used by `~>`: drop pre-release segments,
    /// drop the last segment when more than one remains, and increment.
    #[must_use]
    pub fn bump(&self) -> Self {
        let mut numbers: Vec<u64> = Vec::new();
        for segment in self.raw_segments() {
            match segment {
                Segment::Number(value) => numbers.push(value),
                Segment::Text(_) => break,
            }
        }
        if numbers.len() > 1 {
            numbers.pop();
        }
        if let Some(last) = numbers.last_mut() {
            *last = last.saturating_add(1);
        }
        let raw = numbers.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        let mut segments: Vec<Segment> = numbers.into_iter().map(Segment::Number).collect();
        while segments.len() > 1 && segments.last() == Some(&Segment::Number(0)) {
            segments.pop();
        }
        Self {
            raw,
            segments,
        }
    }

    /// Returns the segments as written, including trailing zeros.
    fn raw_segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        for part in self.raw.replacen('-', ".pre.", 1).split('.') {
            if split_segment(part, &mut segments).is_none() {
                break;
            }
        }
        segments
    }
}

/// Splits a dotted part such as `1rc2` into `1`, `rc`, `2`.
fn split_segment(part: &str, segments: &mut Vec<Segment>) -> Option<()> {
    let bytes = part.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let numeric = bytes[start].is_ascii_digit();
        let end = bytes[start ..]
            .iter()
            .position(|b| b.is_ascii_digit() != numeric)
            .map_or(bytes.len(), |offset| start + offset);
        let piece = &part[start .. end];
        if numeric {
            segments.push(Segment::Number(piece.parse().ok()?));
        } else {
            segments.push(Segment::Text(piece.to_string()));
        }
        start = end;
    }
    Some(())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        let zero = Segment::Number(0);
        for index in 0 .. len {
            let left = self.segments.get(index).unwrap_or(&zero);
            let right = other.segments.get(index).unwrap_or(&zero);
            let ordering = left.compare(right);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SECTION: Requirement
// ============================================================================

/// Requirement operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `~>`
    Pessimistic,
}

impl Operator {
    /// Returns the operator spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Pessimistic => "~>",
        }
    }
}

/// Operators ordered so two-character spellings match first.
const OPERATORS: [Operator; 7] = [
    Operator::Ne,
    Operator::Ge,
    Operator::Le,
    Operator::Pessimistic,
    Operator::Eq,
    Operator::Gt,
    Operator::Lt,
];

/// Single `op version` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Comparison operator.
    pub operator: Operator,
    /// Version operand.
    pub version: Version,
}

impl Constraint {
    /// Returns true when `candidate` satisfies the constraint.
    #[must_use]
    pub fn matches(&self, candidate: &Version) -> bool {
        let target = &self.version;
        match self.operator {
            Operator::Eq => candidate == target,
            Operator::Ne => candidate != target,
            Operator::Gt => candidate > target,
            Operator::Lt => candidate < target,
            Operator::Ge => candidate >= target,
            Operator::Le => candidate <= target,
            Operator::Pessimistic => candidate >= target && *candidate < target.bump(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator.as_str(), self.version)
    }
}

/// Conjunction of constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Constraints that must all hold.
    constraints: Vec<Constraint>,
}

impl Requirement {
    /// Parses a comma-separated requirement expression.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::IllformedRequirement`] for empty clauses,
    /// unknown operators, or malformed versions.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let illformed = || VersionError::IllformedRequirement(input.to_string());
        let mut constraints = Vec::new();
        for clause in input.split(',') {
            let clause = clause.trim();
            if clause.is_empty() {
                return Err(illformed());
            }
            let (operator, rest) = OPERATORS
                .iter()
                .find_map(|op| clause.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
                .unwrap_or((Operator::Eq, clause));
            let version = Version::parse(rest).map_err(|_| illformed())?;
            constraints.push(Constraint {
                operator,
                version,
            });
        }
        Ok(Self {
            constraints,
        })
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns true when `candidate` satisfies every constraint.
    #[must_use]
    pub fn is_satisfied_by(&self, candidate: &Version) -> bool {
        self.constraints.iter().all(|constraint| constraint.matches(candidate))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.constraints.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}

impl FromStr for Requirement {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
