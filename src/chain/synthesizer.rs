use crate::core::errors::ApiError;
use crate::history::Turn;
use crate::llm::{ChatMessage, LlmService};
use crate::rag::{RagContextBuilder, RetrievedChunk};

use super::prompts::GroundedAnswerPrompt;

/// Model reply plus the pages actually placed in its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Answers a standalone question from retrieved page chunks.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    llm: LlmService,
    prompt: GroundedAnswerPrompt,
    context_builder: RagContextBuilder,
}

impl AnswerSynthesizer {
    pub fn new(llm: LlmService, prompt: GroundedAnswerPrompt, context_builder: RagContextBuilder) -> Self {
        Self {
            llm,
            prompt,
            context_builder,
        }
    }

    /// Message order: grounded instructions with the context block, the
    /// history, then the question.
    pub async fn synthesize(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        history: &[Turn],
    ) -> Result<GroundedAnswer, ApiError> {
        let context = self.context_builder.build_context(retrieved);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.prompt.system_message(&context.text)));
        messages.extend(history.iter().map(Turn::to_chat_message));
        messages.push(ChatMessage::user(question));

        let answer = self.llm.chat(messages).await?;
        Ok(GroundedAnswer {
            answer: answer.trim().to_string(),
            sources: context.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::history::Role;
    use crate::llm::mock::{service_with, MockProvider};
    use crate::rag::{ContextBuilderConfig, DocumentChunk};

    fn chunk(content: &str, url: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: DocumentChunk {
                chunk_id: "ing-0".to_string(),
                content: content.to_string(),
                title: Some("T".to_string()),
                source: Some(url.to_string()),
                session_id: "abc".to_string(),
                ingestion_id: "ing".to_string(),
                chunk_index: 0,
            },
            score,
        }
    }

    fn sky_chunk() -> RetrievedChunk {
        chunk("The sky is blue.", "http://x", 0.9)
    }

    fn synthesizer(provider: Arc<MockProvider>) -> AnswerSynthesizer {
        AnswerSynthesizer::new(
            service_with(provider),
            GroundedAnswerPrompt::default(),
            RagContextBuilder::default(),
        )
    }

    #[tokio::test]
    async fn answers_from_retrieved_context() {
        let provider = Arc::new(MockProvider::grounded());
        let synthesizer = synthesizer(provider.clone());
        let history = vec![Turn::new(Role::User, "hello"), Turn::new(Role::Assistant, "hi")];

        let answer = synthesizer
            .synthesize("What color is the sky?", &[sky_chunk()], &history)
            .await
            .expect("synthesize");

        assert!(answer.answer.contains("blue"));
        assert_eq!(answer.sources, vec!["T, http://x"]);
        let transcript = &provider.transcripts()[0];
        assert_eq!(transcript.len(), 4);
        assert!(transcript[0].content.contains("<context>"));
        assert!(transcript[0].content.contains("[1] (Source: T, http://x)"));
        assert_eq!(transcript[1], ChatMessage::user("hello"));
        assert_eq!(transcript[2], ChatMessage::assistant("hi"));
        assert_eq!(transcript[3], ChatMessage::user("What color is the sky?"));
    }

    #[tokio::test]
    async fn no_context_lets_the_model_decline() {
        let provider = Arc::new(MockProvider::grounded());
        let synthesizer = synthesizer(provider);

        let answer = synthesizer
            .synthesize("Who won the match?", &[], &[])
            .await
            .expect("synthesize");

        assert_eq!(answer.answer, "I don't know.");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn sources_only_cover_chunks_that_fit() {
        let provider = Arc::new(MockProvider::grounded());
        let synthesizer = AnswerSynthesizer::new(
            service_with(provider.clone()),
            GroundedAnswerPrompt::default(),
            RagContextBuilder::new(ContextBuilderConfig {
                max_context_length: 50,
                include_citations: true,
            }),
        );
        let retrieved = vec![
            sky_chunk(),
            chunk("Clouds are mostly water droplets and ice crystals.", "http://y", 0.4),
        ];

        let answer = synthesizer
            .synthesize("What color is the sky?", &retrieved, &[])
            .await
            .expect("synthesize");

        assert_eq!(answer.sources, vec!["T, http://x"]);
        assert!(!provider.transcripts()[0][0].content.contains("Clouds"));
    }
}
