//! Typed instruction sets, one per pipeline stage.
//!
//! Every recognised instruction is an explicit field; rendering joins the
//! non-empty fields in declaration order.

use serde::{Deserialize, Serialize};

use crate::core::config::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub chat: PlainChatPrompt,
    pub reformulation: ReformulationPrompt,
    pub grounded_answer: GroundedAnswerPrompt,
}

/// Instructions for answering from the model alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlainChatPrompt {
    pub persona: String,
    pub uncertainty_rule: String,
    pub math_rule: String,
    pub code_rule: String,
    pub code_example: String,
    pub code_explanation_rule: String,
}

impl Default for PlainChatPrompt {
    fn default() -> Self {
        Self {
            persona: defaults::CHAT_PERSONA.to_string(),
            uncertainty_rule: defaults::CHAT_UNCERTAINTY_RULE.to_string(),
            math_rule: defaults::MATH_RULE.to_string(),
            code_rule: defaults::CHAT_CODE_RULE.to_string(),
            code_example: defaults::CHAT_CODE_EXAMPLE.to_string(),
            code_explanation_rule: defaults::CHAT_CODE_EXPLANATION_RULE.to_string(),
        }
    }
}

impl PlainChatPrompt {
    pub fn system_message(&self) -> String {
        join_rules(&[
            &self.persona,
            &self.uncertainty_rule,
            &self.math_rule,
            &self.code_rule,
            &self.code_example,
            &self.code_explanation_rule,
        ])
    }
}

/// Instructions for rewriting a follow-up into a standalone question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReformulationPrompt {
    pub instruction: String,
}

impl Default for ReformulationPrompt {
    fn default() -> Self {
        Self {
            instruction: defaults::REFORMULATION_INSTRUCTION.to_string(),
        }
    }
}

impl ReformulationPrompt {
    pub fn system_message(&self) -> String {
        self.instruction.trim().to_string()
    }
}

/// Instructions for answering strictly from retrieved page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundedAnswerPrompt {
    pub persona: String,
    pub grounding_rule: String,
    pub uncertainty_rule: String,
    pub length_rule: String,
    pub math_rule: String,
    pub code_rule: String,
}

impl Default for GroundedAnswerPrompt {
    fn default() -> Self {
        Self {
            persona: defaults::GROUNDED_PERSONA.to_string(),
            grounding_rule: defaults::GROUNDING_RULE.to_string(),
            uncertainty_rule: defaults::GROUNDED_UNCERTAINTY_RULE.to_string(),
            length_rule: defaults::GROUNDED_LENGTH_RULE.to_string(),
            math_rule: defaults::GROUNDED_MATH_RULE.to_string(),
            code_rule: defaults::GROUNDED_CODE_RULE.to_string(),
        }
    }
}

impl GroundedAnswerPrompt {
    /// The rules followed by the grounding block.
    pub fn system_message(&self, context: &str) -> String {
        let rules = join_rules(&[
            &self.persona,
            &self.grounding_rule,
            &self.uncertainty_rule,
            &self.length_rule,
            &self.math_rule,
            &self.code_rule,
        ]);
        format!("{}\n\n<context>\n{}\n</context>", rules, context)
    }
}

fn join_rules(rules: &[&String]) -> String {
    rules
        .iter()
        .map(|rule| rule.trim())
        .filter(|rule| !rule.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
