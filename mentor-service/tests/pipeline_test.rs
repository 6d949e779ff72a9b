//! End-to-end pipeline tests over in-memory collaborators: trigger
//! policies, prompt bounds, context retrieval, and background-task
//! enqueueing.

mod common;

use common::{
    assistant_message, chat_for, mentor, seed_exchanges, summarizer_for, test_pipeline, titler_for,
    user_message, TEST_CHAT_MODEL, TEST_VISION_MODEL,
};
use mentor_service::models::{Chat, DocumentSource, KnowledgeDocument, MessageRole, UserProfile};
use mentor_service::services::memory::SummarizeOutcome;
use mentor_service::services::pipeline::SendMode;
use mentor_service::services::tasks::BackgroundTask;
use mentor_service::services::title::TitleOutcome;
use service_core::error::AppError;
use tokio::sync::mpsc::error::TryRecvError;

#[tokio::test]
async fn first_exchange_persists_messages_and_schedules_title_only() {
    let mut tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());
    tp.provider.push_reply("Start by talking to customers.");

    let outcome = tp
        .pipeline
        .send_message(
            "user-1",
            &chat.id,
            "How do I validate a startup idea?",
            None,
            SendMode::Blocking,
        )
        .await
        .unwrap();

    let messages = tp.store.messages_for(&chat.id);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].id, outcome.user_message_id);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "Start by talking to customers.");
    assert_eq!(messages[1].id, outcome.assistant_message_id);

    // Title generation fires for the first exchange; the memory
    // summarizer does not (2 messages < the trigger floor of 6).
    match tp.task_rx.try_recv().unwrap() {
        BackgroundTask::GenerateTitle { first_message, .. } => {
            assert_eq!(first_message, "How do I validate a startup idea?");
        }
        other => panic!("expected GenerateTitle, got {:?}", other),
    }
    assert!(matches!(tp.task_rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn memory_trigger_requires_floor_and_divisibility() {
    // 4 prior messages -> total 6 after the exchange: floor reached but
    // 6 % 4 != 0, so no summarization.
    let mut tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());
    seed_exchanges(&tp.store, &chat, 2);

    tp.pipeline
        .send_message("user-1", &chat.id, "fifth message", None, SendMode::Blocking)
        .await
        .unwrap();
    assert!(matches!(tp.task_rx.try_recv(), Err(TryRecvError::Empty)));

    // 6 prior messages -> total 8: divisible by 4 and above the floor.
    let mut tp = test_pipeline();
    let mentor2 = common::mentor("Grace");
    let chat2 = chat_for("user-1", &mentor2);
    tp.store.add_mentor(mentor2.clone());
    tp.store.add_chat(chat2.clone());
    seed_exchanges(&tp.store, &chat2, 3);

    tp.pipeline
        .send_message("user-1", &chat2.id, "seventh message", None, SendMode::Blocking)
        .await
        .unwrap();

    match tp.task_rx.try_recv().unwrap() {
        BackgroundTask::SummarizeMemory {
            user_id,
            mentor_id,
            ..
        } => {
            assert_eq!(user_id, "user-1");
            assert_eq!(mentor_id, mentor2.id);
        }
        other => panic!("expected SummarizeMemory, got {:?}", other),
    }
}

#[tokio::test]
async fn history_replayed_to_model_is_capped_at_the_most_recent_ten() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    for i in 0..25 {
        let message = if i % 2 == 0 {
            user_message(&chat, &format!("m{}", i))
        } else {
            assistant_message(&chat, &format!("m{}", i))
        };
        tp.store.add_message(message);
    }

    tp.pipeline
        .send_message("user-1", &chat.id, "newest", None, SendMode::Blocking)
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    // 10 history turns plus the incoming message as the final turn.
    assert_eq!(request.turns.len(), 11);
    assert_eq!(request.turns[0].text(), "m15");
    assert_eq!(request.turns[9].text(), "m24");
    assert_eq!(request.turns[10].text(), "newest");
}

#[tokio::test]
async fn knowledge_block_is_omitted_when_nothing_matches() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_document(KnowledgeDocument::new(
        mentor.id.clone(),
        "Pricing".to_string(),
        "How to price".to_string(),
        DocumentSource::Manual,
        "user-9".to_string(),
    ));
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    tp.pipeline
        .send_message("user-1", &chat.id, "tell me about sailing", None, SendMode::Blocking)
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    assert!(!request.system.contains("knowledge base"));
}

#[tokio::test]
async fn matching_documents_are_folded_into_the_system_prompt() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_document(KnowledgeDocument::new(
        mentor.id.clone(),
        "Pricing".to_string(),
        "Anchor high, discount rarely".to_string(),
        DocumentSource::Manual,
        "user-9".to_string(),
    ));
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    tp.pipeline
        .send_message("user-1", &chat.id, "how should I do pricing?", None, SendMode::Blocking)
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    assert!(request.system.contains("1. Pricing: Anchor high, discount rarely"));
}

#[tokio::test]
async fn unresolvable_image_reference_falls_back_to_text_only_turn() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());
    // No mapping in the image store: the reference does not resolve.

    tp.pipeline
        .send_message(
            "user-1",
            &chat.id,
            "what do you think of this deck?",
            Some("missing-image"),
            SendMode::Blocking,
        )
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    let last_turn = request.turns.last().unwrap();
    assert!(!last_turn.has_image());
    // The image note still lands in the system prompt, and the model
    // stays the text one.
    assert!(request.system.contains("shared an image"));
    assert_eq!(request.model, TEST_CHAT_MODEL);
}

#[tokio::test]
async fn resolved_image_selects_the_vision_model() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());
    tp.images.map("img-1", "https://blobs.example/img-1.png");

    tp.pipeline
        .send_message(
            "user-1",
            &chat.id,
            "what do you think?",
            Some("img-1"),
            SendMode::Blocking,
        )
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    assert!(request.turns.last().unwrap().has_image());
    assert_eq!(request.model, TEST_VISION_MODEL);
}

#[tokio::test]
async fn sending_to_a_missing_or_foreign_chat_is_not_found() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    let missing = tp
        .pipeline
        .send_message("user-1", "no-such-chat", "hi", None, SendMode::Blocking)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let foreign = tp
        .pipeline
        .send_message("user-2", &chat.id, "hi", None, SendMode::Blocking)
        .await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn user_profile_and_memory_are_folded_into_the_prompt() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    let mut user = UserProfile::new("user-1".to_string());
    user.name = Some("Sam".to_string());
    user.goals = Some("Grow the bakery".to_string());
    tp.store.add_user(user);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());

    tp.store.add_memory(mentor_service::models::Memory::new(
        "user-1".to_string(),
        mentor.id.clone(),
        vec!["Owns a bakery in Lisbon".to_string()],
        2,
    ));

    tp.pipeline
        .send_message("user-1", &chat.id, "next steps?", None, SendMode::Blocking)
        .await
        .unwrap();

    let request = tp.provider.last_request().unwrap();
    assert!(request.system.contains("- Name: Sam"));
    assert!(request.system.contains("- Goals: Grow the bakery"));
    assert!(request.system.contains("What you remember from 2 past conversations"));
    assert!(request.system.contains("- Owns a bakery in Lisbon"));
}

// Memory summarizer semantics

#[tokio::test]
async fn summarizer_is_a_no_op_below_four_messages() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());
    tp.store.add_message(user_message(&chat, "hello"));
    tp.store.add_message(assistant_message(&chat, "hi"));
    tp.store.add_message(user_message(&chat, "more"));

    let summarizer = summarizer_for(&tp);
    let outcome = summarizer
        .summarize(&chat.id, "user-1", &mentor.id)
        .await
        .unwrap();

    assert_eq!(outcome, SummarizeOutcome::Skipped("too few messages"));
    assert!(tp.store.memory_for("user-1", &mentor.id).is_none());
    // The model was never consulted.
    assert!(tp.provider.requests().is_empty());
}

#[tokio::test]
async fn summarizer_skips_chats_with_no_user_text() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());
    for _ in 0..4 {
        tp.store.add_message(assistant_message(&chat, "unsolicited advice"));
    }

    let summarizer = summarizer_for(&tp);
    let outcome = summarizer
        .summarize(&chat.id, "user-1", &mentor.id)
        .await
        .unwrap();

    assert_eq!(outcome, SummarizeOutcome::Skipped("no user-authored text"));
    assert!(tp.store.memory_for("user-1", &mentor.id).is_none());
}

#[tokio::test]
async fn summarizer_caps_points_at_five_and_replaces_wholesale() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());
    seed_exchanges(&tp.store, &chat, 3);

    let summarizer = summarizer_for(&tp);

    tp.provider
        .push_reply("one\ntwo\nthree\nfour\nfive\nsix\nseven");
    let outcome = summarizer
        .summarize(&chat.id, "user-1", &mentor.id)
        .await
        .unwrap();
    assert_eq!(outcome, SummarizeOutcome::Updated { points: 5 });

    let memory = tp.store.memory_for("user-1", &mentor.id).unwrap();
    assert_eq!(memory.key_points.len(), 5);
    assert_eq!(memory.conversation_count, 1);

    // A second run replaces the list and bumps the counter by one.
    tp.provider.push_reply("fresh point");
    summarizer
        .summarize(&chat.id, "user-1", &mentor.id)
        .await
        .unwrap();

    let memory = tp.store.memory_for("user-1", &mentor.id).unwrap();
    assert_eq!(memory.key_points, vec!["fresh point".to_string()]);
    assert_eq!(memory.conversation_count, 2);
}

#[tokio::test]
async fn summarizer_failure_leaves_memory_untouched() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor.clone());
    tp.store.add_chat(chat.clone());
    seed_exchanges(&tp.store, &chat, 3);

    tp.provider.push_error(
        mentor_service::services::providers::ProviderError::ServerError("boom".to_string()),
    );

    let summarizer = summarizer_for(&tp);
    let result = summarizer.summarize(&chat.id, "user-1", &mentor.id).await;

    assert!(result.is_err());
    assert!(tp.store.memory_for("user-1", &mentor.id).is_none());
}

// Title generator semantics

#[tokio::test]
async fn title_generator_patches_the_default_title() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    tp.provider.push_reply("\"Validating Startup Ideas\"");
    let titler = titler_for(&tp);
    let outcome = titler
        .generate(&chat.id, "How do I validate a startup idea?")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TitleOutcome::Updated("Validating Startup Ideas".to_string())
    );
    assert_eq!(tp.store.chat(&chat.id).unwrap().title, "Validating Startup Ideas");
}

#[tokio::test]
async fn title_generator_never_overwrites_a_manual_rename() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());
    tp.store.rename_chat(&chat.id, "My own name");

    let titler = titler_for(&tp);
    let outcome = titler.generate(&chat.id, "first message").await.unwrap();

    assert_eq!(outcome, TitleOutcome::Skipped("title already customised"));
    assert_eq!(tp.store.chat(&chat.id).unwrap().title, "My own name");
    // No completion was attempted for a renamed chat.
    assert!(tp.provider.requests().is_empty());
}

#[tokio::test]
async fn title_generator_failure_keeps_the_default_title() {
    let tp = test_pipeline();
    let mentor = mentor("Ada");
    let chat = chat_for("user-1", &mentor);
    let default_title = Chat::default_title("Ada");
    tp.store.add_mentor(mentor);
    tp.store.add_chat(chat.clone());

    tp.provider.push_error(
        mentor_service::services::providers::ProviderError::RateLimited,
    );

    let titler = titler_for(&tp);
    let result = titler.generate(&chat.id, "first message").await;

    assert!(result.is_err());
    assert_eq!(tp.store.chat(&chat.id).unwrap().title, default_title);
}

// Upstream error taxonomy through the blocking send path

#[tokio::test]
async fn provider_failures_surface_distinct_user_facing_errors() {
    use mentor_service::services::providers::ProviderError;

    let cases: Vec<(ProviderError, fn(&AppError) -> bool)> = vec![
        (ProviderError::RateLimited, |e| {
            matches!(e, AppError::TooManyRequests(_, _))
        }),
        (ProviderError::ServerError("500".to_string()), |e| {
            matches!(e, AppError::BadGateway(m) if m.contains("temporarily unavailable"))
        }),
        (ProviderError::AuthRejected("401".to_string()), |e| {
            matches!(e, AppError::BadGateway(m) if m.contains("rejected"))
        }),
        (ProviderError::NotConfigured("no key".to_string()), |e| {
            matches!(e, AppError::ConfigError(_))
        }),
    ];

    for (error, check) in cases {
        let tp = test_pipeline();
        let mentor = mentor("Ada");
        let chat = chat_for("user-1", &mentor);
        tp.store.add_mentor(mentor);
        tp.store.add_chat(chat.clone());
        tp.provider.push_error(error);

        let result = tp
            .pipeline
            .send_message("user-1", &chat.id, "hello", None, SendMode::Blocking)
            .await;

        let err = result.unwrap_err();
        assert!(check(&err), "unexpected mapping: {:?}", err);

        // The drafted user message is preserved even when the reply fails.
        let messages = tp.store.messages_for(&chat.id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }
}
