use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One discrete unit of relayed data. Payloads are opaque to the server
/// (clients may well ship end-to-end encrypted content), so nothing here is
/// parsed beyond the byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    /// Payload length in bytes, the only property the relay inspects.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Server-emitted presence control message: `{"_control":"online","count":N}`.
///
/// The `_control` marker is how clients tell this apart from relayed
/// application payloads. Inbound client frames are never inspected for the
/// marker; they are always treated as ordinary relay traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineCount {
    #[serde(rename = "_control")]
    pub control: String,
    pub count: usize,
}

impl OnlineCount {
    pub fn new(count: usize) -> Self {
        Self {
            control: "online".to_string(),
            count,
        }
    }

    pub fn encode(&self) -> String {
        serde_json::json!({ "_control": self.control, "count": self.count }).to_string()
    }
}
