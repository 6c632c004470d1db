//! Scope algebra for consent reconciliation.

use std::collections::BTreeSet;

use carebridge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// A single access scope token, e.g. `patient/coverage.read`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    /// Creates a validated scope: non-empty and free of whitespace.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation("scope must not be empty".to_owned()));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(format!(
                "scope '{trimmed}' must not contain whitespace"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the scope string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Scope> for String {
    fn from(value: Scope) -> Self {
        value.0
    }
}

/// An ordered set of scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parses a list of scope strings into a set.
    pub fn parse<I, S>(values: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scopes = BTreeSet::new();
        for value in values {
            scopes.insert(Scope::new(value)?);
        }
        Ok(Self(scopes))
    }

    /// Adds a scope to the set.
    pub fn insert(&mut self, scope: Scope) {
        self.0.insert(scope);
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set contains the given scope.
    #[must_use]
    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    /// Scopes present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Scopes present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Iterates the scopes in order.
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }

    /// Space-separated wire representation.
    #[must_use]
    pub fn to_space_separated(&self) -> String {
        self.0
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parses the space-separated wire representation.
    pub fn from_space_separated(value: &str) -> AppResult<Self> {
        Self::parse(value.split_whitespace().map(str::to_owned))
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Explicit configuration listing the scopes that cover personally
/// identifying (demographic) data.
///
/// Passed in at the boundary; there is no global scope registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopePolicy {
    demographic: ScopeSet,
}

impl ScopePolicy {
    /// Creates a policy from the configured demographic scope set.
    #[must_use]
    pub fn new(demographic: ScopeSet) -> Self {
        Self { demographic }
    }

    /// The configured demographic scopes.
    #[must_use]
    pub fn demographic(&self) -> &ScopeSet {
        &self.demographic
    }

    /// Computes the grantable scope set for an authorization.
    ///
    /// `requested` arrives already narrowed to the application's registered
    /// scope set by the protocol layer. When demographic sharing is not
    /// allowed (beneficiary declined, or the application does not request
    /// demographic data), demographic scopes are removed.
    #[must_use]
    pub fn grantable(&self, requested: &ScopeSet, allow_demographic: bool) -> ScopeSet {
        if allow_demographic {
            requested.clone()
        } else {
            requested.difference(&self.demographic)
        }
    }
}
