use std::sync::{Arc, OnceLock};

use super::pipeline::{Pipeline, PipelineKind};

/// Process-wide pipeline switch.
///
/// Starts on plain chat and moves to the retrieval pipeline at most once;
/// there is no way back. Reads never block.
pub struct PipelineSelector {
    plain: Arc<Pipeline>,
    rag: OnceLock<Arc<Pipeline>>,
}

impl PipelineSelector {
    pub fn new(plain: Pipeline) -> Self {
        Self {
            plain: Arc::new(plain),
            rag: OnceLock::new(),
        }
    }

    pub fn current(&self) -> Arc<Pipeline> {
        self.rag.get().unwrap_or(&self.plain).clone()
    }

    pub fn kind(&self) -> PipelineKind {
        if self.rag.get().is_some() {
            PipelineKind::RetrievalAugmented
        } else {
            PipelineKind::PlainChat
        }
    }

    /// Installs the pipeline produced by `build` unless one is already
    /// installed. Returns whether this call made the switch; `build` only
    /// runs when it does.
    pub fn upgrade_to_rag<F>(&self, build: F) -> bool
    where
        F: FnOnce() -> Pipeline,
    {
        let mut switched = false;
        self.rag.get_or_init(|| {
            switched = true;
            Arc::new(build())
        });
        if switched {
            tracing::info!("Switched answering pipeline to retrieval-augmented");
        }
        switched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::chain::prompts::{GroundedAnswerPrompt, PlainChatPrompt, ReformulationPrompt};
    use crate::chain::{AnswerSynthesizer, PlainChatChain, QueryReformulator, RagChain};
    use crate::llm::mock::{service_with, MockProvider};
    use crate::rag::{RagContextBuilder, RetrievalIndex};

    fn plain() -> Pipeline {
        let llm = service_with(Arc::new(MockProvider::grounded()));
        Pipeline::PlainChat(PlainChatChain::new(llm, PlainChatPrompt::default()))
    }

    fn rag() -> Pipeline {
        let llm = service_with(Arc::new(MockProvider::grounded()));
        Pipeline::RetrievalAugmented(RagChain::new(
            RetrievalIndex::in_memory(llm.clone()),
            QueryReformulator::new(llm.clone(), ReformulationPrompt::default()),
            AnswerSynthesizer::new(llm, GroundedAnswerPrompt::default(), RagContextBuilder::default()),
            4,
        ))
    }

    #[test]
    fn starts_on_plain_chat() {
        let selector = PipelineSelector::new(plain());
        assert_eq!(selector.kind(), PipelineKind::PlainChat);
        assert_eq!(selector.current().kind(), PipelineKind::PlainChat);
    }

    #[test]
    fn upgrade_happens_once_and_sticks() {
        let selector = PipelineSelector::new(plain());
        let builds = AtomicUsize::new(0);

        assert!(selector.upgrade_to_rag(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            rag()
        }));
        assert!(!selector.upgrade_to_rag(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            rag()
        }));

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(selector.kind(), PipelineKind::RetrievalAugmented);
        assert_eq!(selector.current().kind(), PipelineKind::RetrievalAugmented);
    }

    #[test]
    fn concurrent_upgrades_have_a_single_winner() {
        let selector = Arc::new(PipelineSelector::new(plain()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let selector = selector.clone();
                std::thread::spawn(move || selector.upgrade_to_rag(rag))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|switched| *switched)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(selector.kind(), PipelineKind::RetrievalAugmented);
    }
}
