//! Test helper module for mentor-service integration tests.
//!
//! Provides an in-memory `ConversationStore`, a static image store, and
//! fixtures so the pipeline tests run hermetically (no MongoDB, no
//! network).

#![allow(dead_code)]

use async_trait::async_trait;
use mentor_service::models::{
    Chat, KnowledgeDocument, Memory, Mentor, Message, MessageRole, UserProfile,
};
use mentor_service::services::completion::{CompletionEngine, CompletionSettings};
use mentor_service::services::context::{ContextLimits, ContextRetriever};
use mentor_service::services::memory::{MemoryPolicy, MemorySummarizer};
use mentor_service::services::pipeline::ChatPipeline;
use mentor_service::services::providers::mock::MockChatProvider;
use mentor_service::services::providers::ChatProvider;
use mentor_service::services::storage::ImageStore;
use mentor_service::services::store::ConversationStore;
use mentor_service::services::tasks::{BackgroundTask, TaskQueue};
use mentor_service::services::title::TitleGenerator;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// In-memory store. Messages keep insertion order, which the fixtures
/// make chronological.
#[derive(Default)]
pub struct InMemoryStore {
    pub mentors: Mutex<HashMap<String, Mentor>>,
    pub users: Mutex<HashMap<String, UserProfile>>,
    pub chats: Mutex<HashMap<String, Chat>>,
    pub messages: Mutex<Vec<Message>>,
    pub memories: Mutex<HashMap<(String, String), Memory>>,
    pub documents: Mutex<Vec<KnowledgeDocument>>,
    /// Every content write per message id, in write order.
    pub content_writes: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryStore {
    pub fn add_mentor(&self, mentor: Mentor) {
        self.mentors.lock().unwrap().insert(mentor.id.clone(), mentor);
    }

    pub fn add_user(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn add_chat(&self, chat: Chat) {
        self.chats.lock().unwrap().insert(chat.id.clone(), chat);
    }

    pub fn add_document(&self, document: KnowledgeDocument) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn add_message(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn chat(&self, chat_id: &str) -> Option<Chat> {
        self.chats.lock().unwrap().get(chat_id).cloned()
    }

    pub fn messages_for(&self, chat_id: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn add_memory(&self, memory: Memory) {
        self.memories.lock().unwrap().insert(
            (memory.user_id.clone(), memory.mentor_id.clone()),
            memory,
        );
    }

    pub fn memory_for(&self, user_id: &str, mentor_id: &str) -> Option<Memory> {
        self.memories
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), mentor_id.to_string()))
            .cloned()
    }

    pub fn writes_for(&self, message_id: &str) -> Vec<String> {
        self.content_writes
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rename_chat(&self, chat_id: &str, title: &str) {
        if let Some(chat) = self.chats.lock().unwrap().get_mut(chat_id) {
            chat.title = title.to_string();
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn find_mentor(&self, mentor_id: &str) -> Result<Option<Mentor>, AppError> {
        Ok(self.mentors.lock().unwrap().get(mentor_id).cloned())
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn find_chat(&self, chat_id: &str) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.lock().unwrap().get(chat_id).cloned())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, AppError> {
        Ok(self.messages_for(chat_id))
    }

    async fn count_chat_messages(&self, chat_id: &str) -> Result<u64, AppError> {
        Ok(self.messages_for(chat_id).len() as u64)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn set_message_content(&self, message_id: &str, content: &str) -> Result<(), AppError> {
        for message in self.messages.lock().unwrap().iter_mut() {
            if message.id == message_id {
                message.content = content.to_string();
            }
        }
        self.content_writes
            .lock()
            .unwrap()
            .entry(message_id.to_string())
            .or_default()
            .push(content.to_string());
        Ok(())
    }

    async fn touch_chat(&self, chat_id: &str) -> Result<(), AppError> {
        if let Some(chat) = self.chats.lock().unwrap().get_mut(chat_id) {
            chat.last_message_at = Some(mongodb::bson::DateTime::now());
        }
        Ok(())
    }

    async fn set_chat_title_if_matches(
        &self,
        chat_id: &str,
        expected_title: &str,
        new_title: &str,
    ) -> Result<bool, AppError> {
        let mut chats = self.chats.lock().unwrap();
        match chats.get_mut(chat_id) {
            Some(chat) if chat.title == expected_title => {
                chat.title = new_title.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_memory(
        &self,
        user_id: &str,
        mentor_id: &str,
    ) -> Result<Option<Memory>, AppError> {
        Ok(self.memory_for(user_id, mentor_id))
    }

    async fn upsert_memory(
        &self,
        user_id: &str,
        mentor_id: &str,
        key_points: &[String],
        conversation_count: i32,
    ) -> Result<(), AppError> {
        let mut memories = self.memories.lock().unwrap();
        let key = (user_id.to_string(), mentor_id.to_string());
        match memories.get_mut(&key) {
            Some(memory) => {
                memory.key_points = key_points.to_vec();
                memory.conversation_count = conversation_count;
            }
            None => {
                memories.insert(
                    key,
                    Memory::new(
                        user_id.to_string(),
                        mentor_id.to_string(),
                        key_points.to_vec(),
                        conversation_count,
                    ),
                );
            }
        }
        Ok(())
    }

    async fn active_documents(
        &self,
        mentor_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.mentor_id == mentor_id && d.is_active)
            .cloned()
            .collect())
    }
}

/// Image store backed by a fixed map; unmapped references resolve to None
/// like a missing blob would.
#[derive(Default)]
pub struct StaticImageStore {
    urls: Mutex<HashMap<String, String>>,
}

impl StaticImageStore {
    pub fn map(&self, image_id: &str, url: &str) {
        self.urls
            .lock()
            .unwrap()
            .insert(image_id.to_string(), url.to_string());
    }
}

#[async_trait]
impl ImageStore for StaticImageStore {
    async fn resolve_url(&self, image_id: &str) -> Result<Option<String>, AppError> {
        Ok(self.urls.lock().unwrap().get(image_id).cloned())
    }
}

// Fixtures

pub fn mentor(name: &str) -> Mentor {
    Mentor::new(
        name.to_string(),
        format!("{} the mentor", name),
        vec!["business".to_string()],
        format!("You are {}, an experienced startup mentor.", name),
        None,
        None,
    )
}

pub fn chat_for(user_id: &str, mentor: &Mentor) -> Chat {
    Chat::new(
        user_id.to_string(),
        mentor.id.clone(),
        Chat::default_title(&mentor.name),
    )
}

pub fn user_message(chat: &Chat, content: &str) -> Message {
    Message::new(
        &chat.id,
        &chat.user_id,
        &chat.mentor_id,
        content.to_string(),
        MessageRole::User,
        None,
    )
}

pub fn assistant_message(chat: &Chat, content: &str) -> Message {
    Message::new(
        &chat.id,
        &chat.user_id,
        &chat.mentor_id,
        content.to_string(),
        MessageRole::Assistant,
        None,
    )
}

/// Seed `pairs` user/assistant exchanges into the chat.
pub fn seed_exchanges(store: &InMemoryStore, chat: &Chat, pairs: usize) {
    for i in 0..pairs {
        store.add_message(user_message(chat, &format!("question {}", i)));
        store.add_message(assistant_message(chat, &format!("answer {}", i)));
    }
}

pub struct TestPipeline {
    pub store: std::sync::Arc<InMemoryStore>,
    pub provider: std::sync::Arc<MockChatProvider>,
    pub images: std::sync::Arc<StaticImageStore>,
    pub pipeline: ChatPipeline,
    pub task_rx: mpsc::Receiver<BackgroundTask>,
}

pub const TEST_CHAT_MODEL: &str = "test-chat-model";
pub const TEST_VISION_MODEL: &str = "test-vision-model";

/// Assemble the full pipeline over in-memory collaborators. Background
/// tasks are not executed; they land in `task_rx` for assertions.
pub fn test_pipeline() -> TestPipeline {
    use std::sync::Arc;

    let store = Arc::new(InMemoryStore::default());
    let provider = Arc::new(MockChatProvider::new());
    let images = Arc::new(StaticImageStore::default());

    let store_dyn: Arc<dyn ConversationStore> = store.clone();
    let provider_dyn: Arc<dyn ChatProvider> = provider.clone();
    let images_dyn: Arc<dyn ImageStore> = images.clone();

    let (queue, task_rx) = TaskQueue::bounded(16);

    let retriever = ContextRetriever::new(
        store_dyn.clone(),
        ContextLimits {
            history_limit: 10,
            knowledge_limit: 3,
            snippet_chars: 500,
        },
    );
    let engine = CompletionEngine::new(
        provider_dyn.clone(),
        store_dyn.clone(),
        CompletionSettings {
            chat_model: TEST_CHAT_MODEL.to_string(),
            vision_model: TEST_VISION_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        },
    );

    let pipeline = ChatPipeline::new(
        store_dyn,
        images_dyn,
        retriever,
        engine,
        queue,
        MemoryPolicy::default(),
    );

    TestPipeline {
        store,
        provider,
        images,
        pipeline,
        task_rx,
    }
}

pub fn summarizer_for(tp: &TestPipeline) -> MemorySummarizer {
    use std::sync::Arc;
    let store_dyn: Arc<dyn ConversationStore> = tp.store.clone();
    let provider_dyn: Arc<dyn ChatProvider> = tp.provider.clone();
    MemorySummarizer::new(
        store_dyn,
        provider_dyn,
        TEST_CHAT_MODEL.to_string(),
        MemoryPolicy::default(),
    )
}

pub fn titler_for(tp: &TestPipeline) -> TitleGenerator {
    use std::sync::Arc;
    let store_dyn: Arc<dyn ConversationStore> = tp.store.clone();
    let provider_dyn: Arc<dyn ChatProvider> = tp.provider.clone();
    TitleGenerator::new(store_dyn, provider_dyn, TEST_CHAT_MODEL.to_string())
}
