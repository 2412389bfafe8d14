//! Tag normalization and tag-predicate filters
//!
//! Provider tags are compared as `key:value` tokens rather than as key/value
//! pairs, so a filter token written on the command line can be matched
//! directly against whatever the provider returns.
//!
//! ## Policies
//!
//! | Filter | Applies to | Matches when | Empty filter |
//! |--------|------------|--------------|--------------|
//! | [`InclusionFilter`] | stacks | every token is present | accepts everything |
//! | [`ExclusionFilter`] | resources | any token is present | protects nothing |
//!
//! Both policies reduce the same per-token primitive, [`TagSet::matches`].

use std::collections::BTreeSet;
use std::fmt;

/// A single provider tag, copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The `key:value` token for this tag
    pub fn token(&self) -> TagToken {
        TagToken(format!("{}:{}", self.key, self.value))
    }
}

/// `key:value` form of a tag, used only for set membership.
///
/// Keys may themselves contain `:` (e.g. `acme:stack:env:prod`); the token is
/// never split back into key and value.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display, derive_more::Deref,
)]
pub struct TagToken(String);

impl TagToken {
    pub fn new(token: impl Into<String>) -> Self {
        TagToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An immutable set of tag tokens.
///
/// Iteration is in sorted token order, so every per-token evaluation over a
/// given set is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<TagToken>);

impl TagSet {
    /// The empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a provider tag collection. Duplicate tags collapse.
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        TagSet(tags.into_iter().map(Tag::token).collect())
    }

    /// Normalize raw key/value pairs as returned by the SDK tag types.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        TagSet(
            pairs
                .into_iter()
                .map(|(k, v)| TagToken(format!("{}:{}", k.as_ref(), v.as_ref())))
                .collect(),
        )
    }

    /// Build a set from already-formed `key:value` tokens (CLI input).
    pub fn from_tokens<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        TagSet(tokens.into_iter().map(|t| TagToken(t.into())).collect())
    }

    pub fn contains(&self, token: &TagToken) -> bool {
        self.0.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// For each token of `self` (in sorted order), whether it is present in `target`.
    ///
    /// `self` acts as the filter; callers reduce the sequence with `all` or `any`.
    pub fn matches<'a>(&'a self, target: &'a TagSet) -> impl Iterator<Item = bool> + 'a {
        self.0.iter().map(move |token| target.contains(token))
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(token.as_str())?;
        }
        f.write_str("}")
    }
}

/// Stack-level filter: a stack qualifies iff it carries every token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionFilter(TagSet);

impl InclusionFilter {
    pub fn new(tokens: TagSet) -> Self {
        Self(tokens)
    }

    pub fn accepts(&self, target: &TagSet) -> bool {
        self.0.matches(target).all(|present| present)
    }

    pub fn tokens(&self) -> &TagSet {
        &self.0
    }
}

/// Resource-level filter: a resource is protected iff it carries any token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter(TagSet);

impl ExclusionFilter {
    pub fn new(tokens: TagSet) -> Self {
        Self(tokens)
    }

    pub fn protects(&self, target: &TagSet) -> bool {
        self.0.matches(target).any(|present| present)
    }

    pub fn tokens(&self) -> &TagSet {
        &self.0
    }
}
