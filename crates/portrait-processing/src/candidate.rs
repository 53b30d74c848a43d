use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

/// Identifies one selected file for the lifetime of its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub fn new() -> Self {
        CandidateId(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file the user picked, before anything about it is trusted.
///
/// Dimensions are unknown until the bytes are decoded.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub id: CandidateId,
    pub file_name: String,
    /// MIME type reported by the picker
    pub content_type: String,
    /// Size reported by the picker
    pub declared_size: u64,
    pub bytes: Bytes,
}

impl ImageCandidate {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Bytes,
    ) -> Self {
        ImageCandidate {
            id: CandidateId::new(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            declared_size: bytes.len() as u64,
            bytes,
        }
    }
}
