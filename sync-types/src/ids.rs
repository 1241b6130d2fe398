//! Identity types for docsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// An opaque identifier for a shared document.
///
/// Never empty. The core treats it as an opaque routing key: two ids are the
/// same document exactly when their strings are equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a DocumentId, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, SyncError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SyncError::EmptyDocumentId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh random DocumentId (UUID v4 text).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl FromStr for DocumentId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

/// A unique identifier for one connected client.
///
/// UUID v4. Travels as its hyphenated string form so it reads the same in
/// JSON and MessagePack frames.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    /// Create a new random ClientId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for ClientId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0.to_string()
    }
}

impl FromStr for ClientId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SyncError::InvalidClientId(s.to_string()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", &self.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_rejects_empty() {
        assert!(matches!(
            DocumentId::new(""),
            Err(SyncError::EmptyDocumentId)
        ));
        assert!("".parse::<DocumentId>().is_err());
    }

    #[test]
    fn document_id_is_opaque() {
        let id = DocumentId::new("doc-1").unwrap();
        assert_eq!(id.as_str(), "doc-1");
        assert_eq!(id.to_string(), "doc-1");
        assert_eq!(format!("{:?}", id), "DocumentId(doc-1)");
    }

    #[test]
    fn generated_document_ids_differ() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }

    #[test]
    fn document_id_deserialize_rejects_empty() {
        let result: Result<DocumentId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let id: DocumentId = serde_json::from_str("\"doc-7\"").unwrap();
        assert_eq!(id.as_str(), "doc-7");
    }

    #[test]
    fn client_id_is_uuid_v4() {
        let id = ClientId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn client_id_serializes_as_string() {
        let id = ClientId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn client_id_parse_failure() {
        let err = "not-a-uuid".parse::<ClientId>().unwrap_err();
        assert!(matches!(err, SyncError::InvalidClientId(_)));
    }

    #[test]
    fn client_id_debug_is_short() {
        let id = ClientId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("ClientId("));
        assert_eq!(debug.len(), "ClientId()".len() + 8);
    }
}
