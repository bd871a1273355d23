//! Conversational backend for the page-chat browser extension.
//!
//! Answers questions with a plain chat pipeline until the first page is
//! submitted, then switches every session to retrieval-augmented answers
//! grounded in the submitted pages.

pub mod chain;
pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector_math;
