use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier of an object in a repository.
///
/// The all-zero id is reserved: as a ref tip it means "the ref does not
/// exist", and as the new id of a ref update it means "delete the ref".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Hash raw bytes without any domain tag.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The zero id.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Whether this is the zero id, which stands for a missing ref.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// `None` for the zero id, `Some(self)` otherwise.
    pub fn non_zero(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex name, as written into persisted state strings.
    pub fn name(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short_name(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a full 64-character hex name.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_name())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zeros() {
        let zero = ObjectId::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_bytes(), &[0u8; 32]);
        assert_eq!(ObjectId::default(), zero);
    }

    #[test]
    fn non_zero_filters_the_zero_id() {
        assert_eq!(ObjectId::zero().non_zero(), None);
        let id = ObjectId::from_bytes(b"tip");
        assert_eq!(id.non_zero(), Some(id));
    }

    #[test]
    fn hex_name_parses_back() {
        let id = ObjectId::from_bytes(b"test");
        assert_eq!(ObjectId::from_hex(&id.name()).unwrap(), id);
        assert_eq!(format!("{id}"), id.name());
    }

    #[test]
    fn short_name_is_8_chars() {
        assert_eq!(ObjectId::from_bytes(b"test").short_name().len(), 8);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert!(matches!(
            ObjectId::from_hex("zz").unwrap_err(),
            TypeError::InvalidHex(_)
        ));
    }
}
