//! Answering pipelines and the machinery that selects and retries them.

pub mod invoker;
pub mod pipeline;
pub mod prompts;
pub mod reformulator;
pub mod selector;
pub mod service;
pub mod synthesizer;


pub use invoker::{Backoff, ResilientInvoker, RetriesExhausted, RetryPolicy};
pub use pipeline::{Pipeline, PipelineAnswer, PipelineInput, PipelineKind, PlainChatChain, RagChain};
pub use reformulator::QueryReformulator;
pub use selector::PipelineSelector;
pub use service::{ChatService, IngestReport, PageContext};
pub use synthesizer::{AnswerSynthesizer, GroundedAnswer};
