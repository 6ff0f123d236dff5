use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque, non-empty byte-string label for topic and outcome names.
///
/// Labels are bounded to [`Label::MAX_LEN`] bytes, matching fixed-width
/// label slots. They render as UTF-8 when the bytes are valid UTF-8 and as
/// `0x`-prefixed hex otherwise.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Label(Vec<u8>);

impl Label {
    /// Maximum label length in bytes.
    pub const MAX_LEN: usize = 32;

    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypeError::EmptyLabel);
        }
        if bytes.len() > Self::MAX_LEN {
            return Err(TypeError::LabelTooLong {
                max: Self::MAX_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed label.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The label as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl TryFrom<Vec<u8>> for Label {
    type Error = TypeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl TryFrom<&str> for Label {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s.as_bytes())
    }
}

impl From<Label> for Vec<u8> {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({self})")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}
