use std::fmt;

use serde::{Deserialize, Serialize};

use topic_types::BlockHeight;

/// Whether a topic still accepts deposits at a given height.
///
/// Derived from the deadline and the observed height, never stored. The
/// transition from `Open` to `Closed` is irreversible because heights only
/// move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowStatus {
    Open,
    Closed,
}

impl WindowStatus {
    pub fn at(current_height: BlockHeight, deadline_block: BlockHeight) -> Self {
        if current_height.is_before(deadline_block) {
            Self::Open
        } else {
            Self::Closed
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
