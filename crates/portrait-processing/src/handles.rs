//! Ephemeral in-memory handles (previews and rendered crops).
//!
//! Every handle belongs to the candidate it was made for. Handles must be
//! released as soon as nothing can display them any more. The arena releases
//! whatever is left when it is dropped.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::candidate::CandidateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Source image shown while editing
    Preview,
    /// Rendered crop awaiting upload
    Output,
}

#[derive(Debug, Clone)]
pub struct ObjectHandle {
    pub id: HandleId,
    pub candidate: CandidateId,
    pub kind: HandleKind,
    /// Process-local URL the handle can be displayed from
    pub url: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct HandleArena {
    handles: HashMap<HandleId, ObjectHandle>,
}

impl HandleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, candidate: CandidateId, kind: HandleKind, bytes: Bytes) -> HandleId {
        let id = HandleId(Uuid::new_v4());
        let handle = ObjectHandle {
            id,
            candidate,
            kind,
            url: format!("blob:portrait/{}", id),
            bytes,
        };
        tracing::debug!(handle = %id, candidate = %candidate, ?kind, "Handle acquired");
        self.handles.insert(id, handle);
        id
    }

    pub fn get(&self, id: HandleId) -> Option<&ObjectHandle> {
        self.handles.get(&id)
    }

    /// Release one handle. Returns whether it was still held.
    pub fn release(&mut self, id: HandleId) -> bool {
        let released = self.handles.remove(&id).is_some();
        if released {
            tracing::debug!(handle = %id, "Handle released");
        }
        released
    }

    /// Release every handle of `candidate`.
    pub fn release_candidate(&mut self, candidate: CandidateId) -> usize {
        let before = self.handles.len();
        self.handles.retain(|_, h| h.candidate != candidate);
        let released = before - self.handles.len();
        if released > 0 {
            tracing::debug!(candidate = %candidate, released, "Candidate handles released");
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let released = self.handles.len();
        self.handles.clear();
        if released > 0 {
            tracing::debug!(released, "All handles released");
        }
        released
    }

    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }

    pub fn outstanding_for(&self, candidate: CandidateId) -> usize {
        self.handles
            .values()
            .filter(|h| h.candidate == candidate)
            .count()
    }
}

impl Drop for HandleArena {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let mut arena = HandleArena::new();
        let candidate = CandidateId::new();
        let id = arena.acquire(candidate, HandleKind::Preview, Bytes::from_static(b"png"));

        let handle = arena.get(id).unwrap();
        assert!(handle.url.starts_with("blob:"));
        assert_eq!(handle.kind, HandleKind::Preview);

        assert!(arena.release(id));
        assert!(!arena.release(id));
        assert_eq!(arena.outstanding(), 0);
    }

    #[test]
    fn test_release_candidate_leaves_others() {
        let mut arena = HandleArena::new();
        let a = CandidateId::new();
        let b = CandidateId::new();
        arena.acquire(a, HandleKind::Preview, Bytes::new());
        arena.acquire(a, HandleKind::Output, Bytes::new());
        arena.acquire(b, HandleKind::Preview, Bytes::new());

        assert_eq!(arena.release_candidate(a), 2);
        assert_eq!(arena.outstanding_for(a), 0);
        assert_eq!(arena.outstanding_for(b), 1);
        assert_eq!(arena.release_all(), 1);
    }
}
