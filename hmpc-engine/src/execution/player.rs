use hmpc_common::{FieldElement, MersennePrime};
use serde::{Deserialize, Serialize};

/// Runtime identity of party.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Default for Identity {
    fn default() -> Self {
        Identity("test_identity".to_string())
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl From<&String> for Identity {
    fn from(s: &String) -> Self {
        Identity(s.clone())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity(s)
    }
}

/// Zero-based index of a party within a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role(pub usize);

impl Role {
    pub fn new(index: usize) -> Self {
        Role(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Shamir evaluation point of this party; party `i` holds `f(i + 1)`,
    /// the secret sits at `f(0)`.
    pub fn point<T: MersennePrime>(&self) -> FieldElement<T> {
        FieldElement::from_int(self.0 as i64 + 1)
    }

    /// Position of this party counted cyclically from `base`.
    pub fn relative_to(&self, base: Role, n_parties: usize) -> usize {
        (self.0 + n_parties - base.0) % n_parties
    }
}

impl From<usize> for Role {
    fn from(index: usize) -> Self {
        Role(index)
    }
}
