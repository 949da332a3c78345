use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// File content selected by the user and not yet uploaded.
///
/// Lives only in memory. It is never serialized, so a persisted draft can
/// only ever carry the file name and, once uploaded, the server path.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl PendingFile {
    /// Create a pending file from raw bytes.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A document slot on a record, e.g. `"exp_certificate_path"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Logical slot name.
    pub slot: String,
    /// Name of the file the user chose, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Storage path assigned by the server after a successful upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_path: Option<String>,
    /// File awaiting upload.
    #[serde(skip)]
    pub pending: Option<PendingFile>,
}

impl Attachment {
    /// An attachment with a freshly chosen file.
    #[must_use]
    pub fn pending(slot: impl Into<String>, file: PendingFile) -> Self {
        Self {
            slot: slot.into(),
            file_name: Some(file.file_name.clone()),
            server_path: None,
            pending: Some(file),
        }
    }

    /// An attachment already stored on the server.
    #[must_use]
    pub fn stored(slot: impl Into<String>, server_path: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            file_name: None,
            server_path: Some(server_path.into()),
            pending: None,
        }
    }

    /// Returns `true` if the slot is satisfied by a pending file or a stored one.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.pending.is_some() || self.server_path.is_some()
    }

    /// Returns `true` if a file is waiting to be uploaded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Value used when diffing against a snapshot: the server path when
    /// known, otherwise the chosen file name. Content is never compared.
    #[must_use]
    pub fn comparison_key(&self) -> (&str, Option<&str>) {
        (
            &self.slot,
            self.server_path.as_deref().or(self.file_name.as_deref()),
        )
    }

    /// Record a successful upload: keep the path, drop the pending bytes.
    pub fn mark_stored(&mut self, server_path: impl Into<String>) {
        self.server_path = Some(server_path.into());
        self.pending = None;
    }

    /// Copy of this attachment without the in-memory file.
    #[must_use]
    pub fn without_pending(&self) -> Self {
        Self {
            pending: None,
            ..self.clone()
        }
    }
}
