use std::fmt::{self, Debug};

/// The stored PIN. Holds exactly `pin_length` ASCII digits; anything else is rejected by
/// [PinCredential::new].
#[derive(Clone, PartialEq, Eq)]
pub struct PinCredential(String);

impl PinCredential {
    pub fn new(value: &str, pin_length: usize) -> Option<Self> {
        is_well_formed(value, pin_length).then(|| Self(value.to_owned()))
    }

    /// Wraps a value read back from storage. Stored PINs are trusted as is, even if the configured
    /// length changed since they were written.
    pub fn from_stored(value: String) -> Option<Self> {
        let value = value.trim().to_owned();
        (!value.is_empty()).then_some(Self(value))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the digits, not even in traces.
impl Debug for PinCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinCredential({})", "*".repeat(self.0.len()))
    }
}

pub fn is_well_formed(value: &str, pin_length: usize) -> bool {
    value.len() == pin_length && value.bytes().all(|b| b.is_ascii_digit())
}
