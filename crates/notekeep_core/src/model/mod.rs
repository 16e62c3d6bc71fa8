//! Domain model for categorized short notes.
//!
//! # Responsibility
//! - Define the canonical note record and its category vocabulary.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Every note is identified by a `NoteId` that is never reissued.
//! - Categories form a closed set; unknown labels are rejected at the edge.

pub mod note;
