use super::{AddressError, is_valid_token};
use std::{fmt, str::FromStr, sync::Arc};

/// Identifier of a process, unique within the peer hosting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(Arc<str>);

impl ProcessId {
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if !is_valid_token(text) {
            return Err(AddressError::InvalidPid(text.to_string()));
        }

        Ok(ProcessId(Arc::from(text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProcessId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessId::parse(s)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
