//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, uniqueness and persistence into store operations.
//! - Keep rendering layers decoupled from storage details.

pub mod note_store;
