/// Identifier for an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdId(pub i64);

/// Identifier for a private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatKey(pub i64);

impl std::fmt::Display for AdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ChatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AdId {
    fn from(id: i64) -> Self {
        AdId(id)
    }
}

impl From<AdId> for i64 {
    fn from(id: AdId) -> Self {
        id.0
    }
}

impl From<i64> for ChatKey {
    fn from(id: i64) -> Self {
        ChatKey(id)
    }
}

impl From<ChatKey> for i64 {
    fn from(key: ChatKey) -> Self {
        key.0
    }
}
