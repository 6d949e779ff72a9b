//! Prompt assembly.
//!
//! Folds the persona instruction, user profile, relationship memory,
//! matched knowledge, and recent history into one system instruction plus
//! an ordered list of role-tagged turns. Blocks render only when they
//! have content; an empty section is omitted, never rendered as a
//! placeholder.

use crate::models::{Memory, MessageRole, UserProfile};
use crate::services::context::{KnowledgeSnippet, RetrievedContext};
use crate::services::providers::ChatTurn;

const IMAGE_NOTE: &str = "The user has shared an image with their message. Acknowledge the image and work what you can see into your feedback.";

const CLOSING_INSTRUCTION: &str = "Stay in character and give specific, actionable advice grounded in your expertise, the user's background, and what you know from previous conversations.";

/// A fully assembled prompt, ready for the completion invoker.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub turns: Vec<ChatTurn>,
}

/// Assemble the prompt for one incoming message. `image_attached` is true
/// whenever the message carries an image reference, independently of
/// whether `image_url` resolved; an unresolvable reference falls back to
/// a text-only final turn while the system note is still included.
pub fn assemble(
    context: &RetrievedContext,
    new_message: &str,
    image_attached: bool,
    image_url: Option<&str>,
) -> AssembledPrompt {
    let mut system = context.mentor.persona_prompt.trim().to_string();

    if let Some(user) = &context.user {
        system.push_str("\n\n");
        system.push_str(&profile_block(user));
    }

    if let Some(memory) = &context.memory {
        if !memory.key_points.is_empty() {
            system.push_str("\n\n");
            system.push_str(&memory_block(memory));
        }
    }

    if !context.snippets.is_empty() {
        system.push_str("\n\n");
        system.push_str(&knowledge_block(&context.snippets));
    }

    if image_attached {
        system.push_str("\n\n");
        system.push_str(IMAGE_NOTE);
    }

    system.push_str("\n\n");
    system.push_str(CLOSING_INSTRUCTION);

    let mut turns: Vec<ChatTurn> = context
        .history
        .iter()
        .map(|message| match message.role {
            MessageRole::User => ChatTurn::user(message.content.clone()),
            MessageRole::Assistant => ChatTurn::assistant(message.content.clone()),
        })
        .collect();

    turns.push(match image_url {
        Some(url) => ChatTurn::user_with_image(new_message, url),
        None => ChatTurn::user(new_message),
    });

    AssembledPrompt { system, turns }
}

fn profile_block(user: &UserProfile) -> String {
    fn field(value: &Option<String>) -> &str {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("Not specified")
    }

    format!(
        "User profile:\n- Name: {}\n- Bio: {}\n- Goals: {}\n- Interests: {}",
        field(&user.name),
        field(&user.bio),
        field(&user.goals),
        field(&user.interests),
    )
}

fn memory_block(memory: &Memory) -> String {
    let plural = if memory.conversation_count == 1 {
        ""
    } else {
        "s"
    };

    let mut block = format!(
        "What you remember from {} past conversation{} with this user:\n",
        memory.conversation_count, plural
    );
    for point in &memory.key_points {
        block.push_str("- ");
        block.push_str(point);
        block.push('\n');
    }
    block.push_str(
        "Use this context to personalise your advice. Reference past discussions when it helps, but do not recite everything at once.",
    );
    block
}

fn knowledge_block(snippets: &[KnowledgeSnippet]) -> String {
    let mut block = String::from("Relevant knowledge from your knowledge base:\n");
    for (index, snippet) in snippets.iter().enumerate() {
        block.push_str(&format!("{}. {}: {}\n", index + 1, snippet.title, snippet.excerpt));
    }
    block.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chat, Memory, Mentor, Message, MessageRole, UserProfile};
    use crate::services::context::RetrievedContext;
    use crate::services::providers::{TurnContent, TurnRole};

    fn base_context() -> RetrievedContext {
        let mentor = Mentor::new(
            "Ada".to_string(),
            "Engineering leader".to_string(),
            vec!["engineering".to_string()],
            "You are Ada, a pragmatic engineering mentor.".to_string(),
            None,
            None,
        );
        let chat = Chat::new(
            "user-1".to_string(),
            mentor.id.clone(),
            Chat::default_title(&mentor.name),
        );

        RetrievedContext {
            chat,
            mentor,
            user: None,
            history: Vec::new(),
            memory: None,
            snippets: Vec::new(),
        }
    }

    #[test]
    fn persona_comes_first_and_sections_follow_in_order() {
        let mut context = base_context();
        let mut user = UserProfile::new("user-1".to_string());
        user.name = Some("Sam".to_string());
        context.user = Some(user);
        context.memory = Some(Memory::new(
            "user-1".to_string(),
            context.mentor.id.clone(),
            vec!["Building a marketplace".to_string()],
            2,
        ));
        context.snippets = vec![KnowledgeSnippet {
            title: "Pricing".to_string(),
            excerpt: "Charge more".to_string(),
        }];

        let prompt = assemble(&context, "How do I price?", false, None);

        let persona = prompt.system.find("pragmatic engineering mentor").unwrap();
        let profile = prompt.system.find("User profile:").unwrap();
        let memory = prompt.system.find("What you remember from").unwrap();
        let knowledge = prompt
            .system
            .find("Relevant knowledge from your knowledge base:")
            .unwrap();

        assert!(persona < profile);
        assert!(profile < memory);
        assert!(memory < knowledge);
    }

    #[test]
    fn missing_profile_fields_render_as_not_specified() {
        let mut context = base_context();
        let mut user = UserProfile::new("user-1".to_string());
        user.name = Some("Sam".to_string());
        context.user = Some(user);

        let prompt = assemble(&context, "hi", false, None);
        assert!(prompt.system.contains("- Name: Sam"));
        assert!(prompt.system.contains("- Bio: Not specified"));
        assert!(prompt.system.contains("- Goals: Not specified"));
    }

    #[test]
    fn profile_block_is_omitted_without_user_context() {
        let prompt = assemble(&base_context(), "hi", false, None);
        assert!(!prompt.system.contains("User profile:"));
    }

    #[test]
    fn empty_memory_and_knowledge_blocks_are_omitted() {
        let mut context = base_context();
        context.memory = Some(Memory::new(
            "user-1".to_string(),
            context.mentor.id.clone(),
            Vec::new(),
            1,
        ));

        let prompt = assemble(&context, "hi", false, None);
        assert!(!prompt.system.contains("What you remember from"));
        assert!(!prompt.system.contains("Relevant knowledge"));
    }

    #[test]
    fn memory_block_renders_count_and_bullets() {
        let mut context = base_context();
        context.memory = Some(Memory::new(
            "user-1".to_string(),
            context.mentor.id.clone(),
            vec!["Runs a bakery".to_string(), "Wants to franchise".to_string()],
            3,
        ));

        let prompt = assemble(&context, "hi", false, None);
        assert!(prompt
            .system
            .contains("What you remember from 3 past conversations"));
        assert!(prompt.system.contains("- Runs a bakery"));
        assert!(prompt.system.contains("- Wants to franchise"));
    }

    #[test]
    fn knowledge_entries_are_numbered() {
        let mut context = base_context();
        context.snippets = vec![
            KnowledgeSnippet {
                title: "A".to_string(),
                excerpt: "first".to_string(),
            },
            KnowledgeSnippet {
                title: "B".to_string(),
                excerpt: "second".to_string(),
            },
        ];

        let prompt = assemble(&context, "hi", false, None);
        assert!(prompt.system.contains("1. A: first"));
        assert!(prompt.system.contains("2. B: second"));
    }

    #[test]
    fn history_is_replayed_in_order_then_new_message_last() {
        let mut context = base_context();
        let chat_id = context.chat.id.clone();
        let mentor_id = context.mentor.id.clone();
        context.history = vec![
            Message::new(&chat_id, "user-1", &mentor_id, "first".to_string(), MessageRole::User, None),
            Message::new(&chat_id, "user-1", &mentor_id, "reply".to_string(), MessageRole::Assistant, None),
        ];

        let prompt = assemble(&context, "second", false, None);
        assert_eq!(prompt.turns.len(), 3);
        assert_eq!(prompt.turns[0].text(), "first");
        assert_eq!(prompt.turns[0].role, TurnRole::User);
        assert_eq!(prompt.turns[1].text(), "reply");
        assert_eq!(prompt.turns[1].role, TurnRole::Assistant);
        assert_eq!(prompt.turns[2].text(), "second");
    }

    #[test]
    fn unresolved_image_falls_back_to_text_only_turn_with_note() {
        let prompt = assemble(&base_context(), "see attached", true, None);
        assert!(prompt.system.contains("shared an image"));
        assert_eq!(
            prompt.turns.last().unwrap().content,
            TurnContent::Text("see attached".to_string())
        );
    }

    #[test]
    fn resolved_image_produces_multimodal_turn() {
        let prompt = assemble(
            &base_context(),
            "see attached",
            true,
            Some("https://img.example/a.png"),
        );
        assert!(prompt.turns.last().unwrap().has_image());
    }
}
