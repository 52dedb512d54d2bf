//! Relation namespace: value-typed keys for every fact in the causal model.
//!
//! A [`RelationKey`] is the identity of one boolean relation variable.  The
//! model builder, the observation parser and the diagnosis extractor all
//! use the same value type, so a key produced in one place always matches
//! the key consumed in another.
//!
//! Canonical text form (used for display, JSON and parsing):
//!
//! ```text
//! working(Pump)
//! connected(Outlet,Power-Board)
//! powered(Fans)
//! signal(Light0,Sensor-Board0)
//! expected-result(LEDs)
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ───────────────────────────────────────────────────────────────
// Node identifiers
// ───────────────────────────────────────────────────────────────

/// Identifier of a hardware node (`"Outlet"`, `"Power-Board"`, ...).
///
/// Case-sensitive.  Must not contain `(`, `)` or `,`; [`NodeId::parse`]
/// rejects those so that every key has an unambiguous text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn parse(raw: &str) -> Result<Self, ParseKeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseKeyError::EmptyOperand);
        }
        if trimmed.contains(['(', ')', ',']) {
            return Err(ParseKeyError::BadOperand(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Infallible constructor for identifiers written in code.
///
/// Identifiers built this way are validated when the owning
/// [`Topology`](crate::topology::Topology) is validated.
impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl TryFrom<String> for NodeId {
    type Error = ParseKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Relation kinds
// ───────────────────────────────────────────────────────────────

/// The five fact kinds of the causal model.
///
/// Variant order is alphabetical by [`RelationKind::name`], which makes
/// the derived key ordering agree with sorting keys by their text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    Connected,
    ExpectedResult,
    Powered,
    Signal,
    Working,
}

impl RelationKind {
    pub const ALL: [Self; 5] = [
        Self::Connected,
        Self::ExpectedResult,
        Self::Powered,
        Self::Signal,
        Self::Working,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::ExpectedResult => "expected-result",
            Self::Powered => "powered",
            Self::Signal => "signal",
            Self::Working => "working",
        }
    }

    /// Number of operands the relation takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Connected | Self::Signal => 2,
            Self::ExpectedResult | Self::Powered | Self::Working => 1,
        }
    }

    /// Root-cause relations.  Only these may appear in a diagnosis;
    /// `powered`, `signal` and `expected-result` are consequences.
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Working | Self::Connected)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ───────────────────────────────────────────────────────────────
// Relation keys
// ───────────────────────────────────────────────────────────────

/// Identity of one relation variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKey {
    /// The link `from → to` is intact.
    Connected(NodeId, NodeId),
    /// The actuator produced the effect it was commanded to produce.
    ExpectedResult(NodeId),
    /// The node receives power.
    Powered(NodeId),
    /// The signal originating at `origin` is present at `at`.
    Signal { origin: NodeId, at: NodeId },
    /// The node itself is healthy.
    Working(NodeId),
}

impl RelationKey {
    pub fn working(node: impl Into<NodeId>) -> Self {
        Self::Working(node.into())
    }

    pub fn connected(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self::Connected(from.into(), to.into())
    }

    pub fn powered(node: impl Into<NodeId>) -> Self {
        Self::Powered(node.into())
    }

    pub fn signal(origin: impl Into<NodeId>, at: impl Into<NodeId>) -> Self {
        Self::Signal {
            origin: origin.into(),
            at: at.into(),
        }
    }

    pub fn expected_result(actuator: impl Into<NodeId>) -> Self {
        Self::ExpectedResult(actuator.into())
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Connected(..) => RelationKind::Connected,
            Self::ExpectedResult(_) => RelationKind::ExpectedResult,
            Self::Powered(_) => RelationKind::Powered,
            Self::Signal { .. } => RelationKind::Signal,
            Self::Working(_) => RelationKind::Working,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind().is_structural()
    }

    /// Positive literal on this key.
    pub fn holds(self) -> Literal {
        Literal::new(self, true)
    }

    /// Negative literal on this key.
    pub fn fails(self) -> Literal {
        Literal::new(self, false)
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Self::Connected(a, b) => write!(f, "{kind}({a},{b})"),
            Self::Signal { origin, at } => write!(f, "{kind}({origin},{at})"),
            Self::ExpectedResult(n) | Self::Powered(n) | Self::Working(n) => {
                write!(f, "{kind}({n})")
            }
        }
    }
}

impl FromStr for RelationKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let open = s
            .find('(')
            .ok_or_else(|| ParseKeyError::Malformed(s.to_owned()))?;
        let inner = s[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| ParseKeyError::Malformed(s.to_owned()))?;

        let name = s[..open].trim();
        let kind = RelationKind::from_name(name)
            .ok_or_else(|| ParseKeyError::UnknownRelation(name.to_owned()))?;

        let operands = inner
            .split(',')
            .map(NodeId::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if operands.len() != kind.arity() {
            return Err(ParseKeyError::Arity {
                kind,
                found: operands.len(),
            });
        }

        let mut ops = operands.into_iter();
        // Arity was checked above, so the iterator holds exactly enough ids.
        let mut next = || ops.next().ok_or(ParseKeyError::EmptyOperand);
        Ok(match kind {
            RelationKind::Connected => Self::Connected(next()?, next()?),
            RelationKind::Signal => Self::Signal {
                origin: next()?,
                at: next()?,
            },
            RelationKind::ExpectedResult => Self::ExpectedResult(next()?),
            RelationKind::Powered => Self::Powered(next()?),
            RelationKind::Working => Self::Working(next()?),
        })
    }
}

impl Serialize for RelationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ───────────────────────────────────────────────────────────────
// Literals
// ───────────────────────────────────────────────────────────────

/// A key with a required truth value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub key: RelationKey,
    pub value: bool,
}

impl Literal {
    pub fn new(key: RelationKey, value: bool) -> Self {
        Self { key, value }
    }

    pub fn negated(&self) -> Self {
        Self::new(self.key.clone(), !self.value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value {
            write!(f, "{}", self.key)
        } else {
            write!(f, "!{}", self.key)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Parse errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseKeyError {
    /// Not of the form `name(operands)`.
    Malformed(String),
    UnknownRelation(String),
    Arity { kind: RelationKind, found: usize },
    EmptyOperand,
    /// Operand contains a reserved character.
    BadOperand(String),
}

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(s) => write!(f, "malformed relation key '{s}'"),
            Self::UnknownRelation(s) => write!(f, "unknown relation '{s}'"),
            Self::Arity { kind, found } => write!(
                f,
                "{kind} takes {} operand(s), found {found}",
                kind.arity()
            ),
            Self::EmptyOperand => write!(f, "empty operand"),
            Self::BadOperand(s) => write!(f, "operand '{s}' contains a reserved character"),
        }
    }
}

impl std::error::Error for ParseKeyError {}
