//! core::namespace
//!
//! Isolation prefixes under the shared storage root.
//!
//! Every engine instance works inside exactly one namespace,
//! `{root}/{namespace}`. Namespaces are either chosen explicitly or formed
//! from a prefix plus a random run of letters, which keeps test instances
//! and parallel pipelines from interfering with each other.
//!
//! # Randomness
//!
//! Suffixes are drawn from a caller-owned, non-cryptographic generator
//! (see [`crate::core::config::Config::rng`]). Two instances drawing a
//! suffix of [`SUFFIX_LEN`] letters collide with probability about
//! `1 / 52^10`; nothing checks for that.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::types::{check_component, TypeError};

/// Alphabet used for random suffixes.
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Number of letters appended by [`Namespace::with_random_suffix`].
pub const SUFFIX_LEN: usize = 10;

/// Generate `n` random ASCII letters.
///
/// # Example
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use snaprepo::core::namespace::random_letters;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let s = random_letters(&mut rng, 12);
/// assert_eq!(s.len(), 12);
/// assert!(s.chars().all(|c| c.is_ascii_alphabetic()));
/// ```
pub fn random_letters<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    (0..n)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

/// A validated namespace name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Use `name` as-is.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidNamespace` if `name` is not a single path
    /// component.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_component(&name)
            .map_err(|rule| TypeError::InvalidNamespace(format!("'{}' {}", name, rule)))?;
        Ok(Self(name))
    }

    /// `prefix` followed by [`SUFFIX_LEN`] random letters.
    ///
    /// An empty prefix is allowed; the suffix alone is a valid name.
    pub fn with_random_suffix<R: Rng + ?Sized>(
        prefix: &str,
        rng: &mut R,
    ) -> Result<Self, TypeError> {
        Self::new(format!("{}{}", prefix, random_letters(rng, SUFFIX_LEN)))
    }

    /// Get the namespace as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
