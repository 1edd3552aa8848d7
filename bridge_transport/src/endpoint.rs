//! Engine identity for log lines
//!
//! Several engines can share a process, one per channel. Each gets a random
//! id, and every log line it writes starts with a short tag derived from it,
//! e.g. `[bridge 1f0c9a3e]`. The alternate form (`{:#}`) prints the full id.

use std::fmt;
use uuid::Uuid;

/// Hex digits kept in the short tag
const TAG_LEN: usize = 8;

/// Identity of one protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Creates a random endpoint id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps a known id, e.g. one agreed with the host
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the short hex tag used in log lines
    pub fn tag(&self) -> String {
        let mut buf = Uuid::encode_buffer();
        let simple = self.0.simple().encode_lower(&mut buf);
        simple[..TAG_LEN].to_string()
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "[bridge {}]", self.0)
        } else {
            write!(f, "[bridge {}]", self.tag())
        }
    }
}
