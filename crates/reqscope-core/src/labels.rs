//! Label keys and name validation.
//!
//! A `LabelKey` identifies exactly one series inside a metric family. Pairs
//! are kept in the family's declared label order so two keys built from the
//! same family compare equal iff every value matches.

use std::fmt;

use crate::error::{Result, ScopeError};

/// Ordered `(name, value)` pairs identifying one series. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LabelKey {
    pairs: Box<[(String, String)]>,
}

impl LabelKey {
    /// Key with no labels (single-series families).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit pairs, keeping the given order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Zip declared names with caller-supplied values.
    ///
    /// Fails when the number of values differs from the number of names.
    pub fn for_family(family: &str, names: &[String], values: &[&str]) -> Result<Self> {
        if names.len() != values.len() {
            return Err(ScopeError::LabelMismatch {
                family: family.to_string(),
                expected: names.len(),
                got: values.len(),
            });
        }
        Ok(Self::from_pairs(
            names.iter().map(String::as_str).zip(values.iter().copied()),
        ))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Value for a label name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        f.write_str("}")
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ScopeError::InvalidName(format!("metric name {name:?}")))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, and not starting with the reserved `__`.
pub fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    } && !name.starts_with("__");
    if ok {
        Ok(())
    } else {
        Err(ScopeError::InvalidName(format!("label name {name:?}")))
    }
}

/// Validate a declared label set: every name valid, no duplicates.
pub(crate) fn validate_label_names(names: &[String]) -> Result<()> {
    for (i, n) in names.iter().enumerate() {
        validate_label_name(n)?;
        if names[..i].contains(n) {
            return Err(ScopeError::InvalidName(format!("duplicate label name {n:?}")));
        }
    }
    Ok(())
}
