//! Relationship memory summarization.
//!
//! Periodically re-derives a short bullet-point memory of a user-mentor
//! relationship from the user's side of the conversation plus the prior
//! memory. Best-effort: the caller (the background task runner) logs
//! failures and never lets them reach the user-facing flow.

use crate::models::memory::MAX_KEY_POINTS;
use crate::models::{Memory, MessageRole};
use crate::services::providers::{ChatProvider, ChatTurn, CompletionRequest};
use crate::services::store::ConversationStore;
use service_core::error::AppError;
use std::sync::Arc;

const SUMMARIZER_SYSTEM: &str =
    "You are an expert at extracting and summarizing key information for mentorship contexts.";

/// When summarization runs relative to total message count in a chat.
#[derive(Debug, Clone, Copy)]
pub struct MemoryPolicy {
    /// No summarization below this many total messages.
    pub trigger_floor: u64,
    /// Runs only when the total is a multiple of this.
    pub trigger_interval: u64,
    /// In-task guard: chats below this size are never summarized.
    pub min_messages: usize,
}

impl MemoryPolicy {
    pub fn is_due(&self, total_messages: u64) -> bool {
        total_messages >= self.trigger_floor && total_messages % self.trigger_interval == 0
    }
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            trigger_floor: 6,
            trigger_interval: 4,
            min_messages: 4,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SummarizeOutcome {
    Updated { points: usize },
    Skipped(&'static str),
}

pub struct MemorySummarizer {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn ChatProvider>,
    model: String,
    policy: MemoryPolicy,
}

impl MemorySummarizer {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn ChatProvider>,
        model: String,
        policy: MemoryPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            model,
            policy,
        }
    }

    /// Re-derive and persist the memory for a (user, mentor) pair from
    /// one chat's history. Returns Skipped when the conversation is too
    /// small or carries no user-authored text; both are silent no-ops.
    #[tracing::instrument(skip(self))]
    pub async fn summarize(
        &self,
        chat_id: &str,
        user_id: &str,
        mentor_id: &str,
    ) -> Result<SummarizeOutcome, AppError> {
        let messages = self.store.chat_messages(chat_id).await?;
        if messages.len() < self.policy.min_messages {
            return Ok(SummarizeOutcome::Skipped("too few messages"));
        }

        let user_text = messages
            .iter()
            .filter(|message| message.role == MessageRole::User)
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if user_text.trim().is_empty() {
            return Ok(SummarizeOutcome::Skipped("no user-authored text"));
        }

        let existing = self.store.find_memory(user_id, mentor_id).await?;

        let request = CompletionRequest {
            model: self.model.clone(),
            system: SUMMARIZER_SYSTEM.to_string(),
            turns: vec![ChatTurn::user(build_summary_prompt(
                &user_text,
                existing.as_ref(),
            ))],
            temperature: 0.3,
            max_tokens: 300,
        };

        let reply = self
            .provider
            .complete(&request)
            .await
            .map_err(AppError::from)?;

        let key_points = parse_key_points(&reply, MAX_KEY_POINTS);
        if key_points.is_empty() {
            return Ok(SummarizeOutcome::Skipped("summarizer returned no points"));
        }

        // One increment per run, not per message. The new points replace
        // the old list; consolidation is the model's job.
        let conversation_count = existing.map(|m| m.conversation_count).unwrap_or(0) + 1;
        self.store
            .upsert_memory(user_id, mentor_id, &key_points, conversation_count)
            .await?;

        tracing::info!(
            points = key_points.len(),
            conversation_count,
            "Relationship memory updated"
        );

        Ok(SummarizeOutcome::Updated {
            points: key_points.len(),
        })
    }
}

fn build_summary_prompt(user_text: &str, existing: Option<&Memory>) -> String {
    let existing_block = match existing {
        Some(memory) if !memory.key_points.is_empty() => {
            let bullets = memory
                .key_points
                .iter()
                .map(|point| format!("- {}", point))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\nExisting memory about this user:\n{}", bullets)
        }
        _ => String::new(),
    };

    format!(
        "Extract key information about this user that would be valuable for future conversations. Focus on:\n\
         - Business ideas, projects, or ventures they're working on\n\
         - Professional goals and aspirations\n\
         - Challenges or problems they're facing\n\
         - Personal interests relevant to mentorship\n\
         - Important context about their background or situation\n\
         - Recurring themes or topics they discuss\n\n\
         User's messages from this conversation:\n{}{}\n\n\
         Return 3-5 concise bullet points of the most important information to remember about this user. \
         Each point should be specific and actionable for future mentorship. \
         If there's overlap with existing memory, consolidate or update the information.\n\n\
         Format as a simple list, one point per line, without bullet symbols:",
        user_text, existing_block
    )
}

/// Split a model reply into trimmed, non-empty lines, dropping any bullet
/// prefixes the model added anyway, capped at `cap` points.
pub fn parse_key_points(text: &str, cap: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
        .filter(|line| !line.is_empty())
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_due_requires_floor_and_interval() {
        let policy = MemoryPolicy::default();
        assert!(!policy.is_due(2));
        assert!(!policy.is_due(4)); // below floor even though divisible
        assert!(!policy.is_due(6)); // at floor but 6 % 4 != 0
        assert!(!policy.is_due(7));
        assert!(policy.is_due(8));
        assert!(!policy.is_due(10));
        assert!(policy.is_due(12));
    }

    #[test]
    fn parse_caps_points_and_drops_blanks() {
        let reply = "one\n\n  two  \nthree\nfour\nfive\nsix\nseven";
        let points = parse_key_points(reply, 5);
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], "two");
        assert_eq!(points[4], "five");
    }

    #[test]
    fn parse_strips_bullet_prefixes() {
        let reply = "- wants to raise a seed round\n* has two cofounders\n• ships weekly";
        let points = parse_key_points(reply, 5);
        assert_eq!(points[0], "wants to raise a seed round");
        assert_eq!(points[1], "has two cofounders");
        assert_eq!(points[2], "ships weekly");
    }

    #[test]
    fn summary_prompt_includes_existing_points_as_bullets() {
        let memory = Memory::new(
            "user-1".to_string(),
            "mentor-1".to_string(),
            vec!["Runs a bakery".to_string()],
            2,
        );
        let prompt = build_summary_prompt("I want to expand", Some(&memory));
        assert!(prompt.contains("Existing memory about this user:"));
        assert!(prompt.contains("- Runs a bakery"));
    }

    #[test]
    fn summary_prompt_omits_existing_block_when_absent() {
        let prompt = build_summary_prompt("I want to expand", None);
        assert!(!prompt.contains("Existing memory"));
    }
}
