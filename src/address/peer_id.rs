use super::{AddressError, is_valid_token};
use std::{fmt, str::FromStr, sync::Arc};

/// Opaque identifier of a node in the overlay.
///
/// Cheap to clone. Equality is byte-exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Arc<str>);

impl PeerId {
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if !is_valid_token(text) {
            return Err(AddressError::InvalidPeerId(text.to_string()));
        }

        Ok(PeerId(Arc::from(text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for PeerId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeerId::parse(s)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
