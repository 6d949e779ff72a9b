//! Database operations for the mentor service.
//!
//! Owns the MongoDB collections, index initialization, and the CRUD and
//! cascade-delete operations used by the HTTP handlers. Also implements
//! the `ConversationStore` contract the pipeline depends on.

use crate::models::{Chat, Feedback, KnowledgeDocument, Memory, Mentor, Message, UserProfile};
use crate::services::store::ConversationStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{FindOptions, IndexOptions, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for mentor-service");

        self.ensure_index(
            &self.messages(),
            doc! { "chat_id": 1, "created_at": 1 },
            "chat_created_idx",
            false,
        )
        .await?;
        self.ensure_index(&self.chats(), doc! { "user_id": 1 }, "user_idx", false)
            .await?;
        self.ensure_index(
            &self.chats(),
            doc! { "user_id": 1, "mentor_id": 1 },
            "user_mentor_idx",
            false,
        )
        .await?;
        self.ensure_index(
            &self.memories(),
            doc! { "user_id": 1, "mentor_id": 1 },
            "user_mentor_unique_idx",
            true,
        )
        .await?;
        self.ensure_index(
            &self.documents(),
            doc! { "mentor_id": 1 },
            "mentor_idx",
            false,
        )
        .await?;
        self.ensure_index(
            &self.feedback(),
            doc! { "created_at": -1 },
            "created_at_idx",
            false,
        )
        .await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    async fn ensure_index<T>(
        &self,
        collection: &Collection<T>,
        keys: Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(name.to_string())
                    .unique(unique)
                    .build(),
            )
            .build();

        collection.create_index(index, None).await.map_err(|e| {
            tracing::error!("Failed to create index {}: {}", name, e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    // Collection accessors

    pub fn mentors(&self) -> Collection<Mentor> {
        self.db.collection("mentors")
    }

    pub fn chats(&self) -> Collection<Chat> {
        self.db.collection("chats")
    }

    pub fn messages(&self) -> Collection<Message> {
        self.db.collection("messages")
    }

    pub fn memories(&self) -> Collection<Memory> {
        self.db.collection("memories")
    }

    pub fn documents(&self) -> Collection<KnowledgeDocument> {
        self.db.collection("documents")
    }

    pub fn users(&self) -> Collection<UserProfile> {
        self.db.collection("users")
    }

    pub fn feedback(&self) -> Collection<Feedback> {
        self.db.collection("feedback")
    }

    // Mentor operations

    pub async fn insert_mentor(&self, mentor: &Mentor) -> Result<(), AppError> {
        self.mentors()
            .insert_one(mentor, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn get_mentor(&self, mentor_id: &str) -> Result<Option<Mentor>, AppError> {
        self.mentors()
            .find_one(doc! { "_id": mentor_id }, None)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_mentors(&self, include_inactive: bool) -> Result<Vec<Mentor>, AppError> {
        let filter = if include_inactive {
            doc! {}
        } else {
            doc! { "is_active": true }
        };

        let cursor = self
            .mentors()
            .find(filter, None)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    pub async fn update_mentor(
        &self,
        mentor_id: &str,
        name: &str,
        bio: &str,
        categories: &[String],
        persona_prompt: &str,
        profile_image: Option<&str>,
    ) -> Result<(), AppError> {
        self.mentors()
            .update_one(
                doc! { "_id": mentor_id },
                doc! {
                    "$set": {
                        "name": name,
                        "bio": bio,
                        "categories": categories.to_vec(),
                        "persona_prompt": persona_prompt,
                        "profile_image": profile_image,
                        "updated_at": BsonDateTime::now(),
                    }
                },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn set_mentor_active(&self, mentor_id: &str, active: bool) -> Result<(), AppError> {
        self.mentors()
            .update_one(
                doc! { "_id": mentor_id },
                doc! { "$set": { "is_active": active, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    // User operations

    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.users()
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(AppError::from)
    }

    /// Patch profile fields, creating the profile record on first write.
    /// Only fields provided by the caller are touched.
    pub async fn patch_user_profile(
        &self,
        user_id: &str,
        name: Option<&str>,
        bio: Option<&str>,
        goals: Option<&str>,
        interests: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<(), AppError> {
        let mut set = doc! { "updated_at": BsonDateTime::now() };
        if let Some(name) = name {
            set.insert("name", name);
        }
        if let Some(bio) = bio {
            set.insert("bio", bio);
        }
        if let Some(goals) = goals {
            set.insert("goals", goals);
        }
        if let Some(interests) = interests {
            set.insert("interests", interests);
        }
        if let Some(profile_image) = profile_image {
            set.insert("profile_image", profile_image);
        }

        let options = UpdateOptions::builder().upsert(true).build();
        self.users()
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": {
                        "is_admin": false,
                        "created_at": BsonDateTime::now(),
                    }
                },
                options,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    // Chat operations

    pub async fn insert_chat(&self, chat: &Chat) -> Result<(), AppError> {
        self.chats()
            .insert_one(chat, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>, AppError> {
        self.chats()
            .find_one(doc! { "_id": chat_id }, None)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_chats_by_user(&self, user_id: &str) -> Result<Vec<Chat>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "last_message_at": -1, "created_at": -1 })
            .build();

        let cursor = self
            .chats()
            .find(doc! { "user_id": user_id, "is_active": true }, options)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    pub async fn rename_chat(&self, chat_id: &str, title: &str) -> Result<(), AppError> {
        self.chats()
            .update_one(
                doc! { "_id": chat_id },
                doc! { "$set": { "title": title, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    /// Delete a chat and every message in it.
    pub async fn delete_chat_cascade(&self, chat_id: &str) -> Result<(), AppError> {
        self.messages()
            .delete_many(doc! { "chat_id": chat_id }, None)
            .await
            .map_err(AppError::from)?;
        self.chats()
            .delete_one(doc! { "_id": chat_id }, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    /// Delete every chat a user has with a mentor, their messages, and
    /// the relationship memory for the pair.
    pub async fn delete_chats_with_mentor(
        &self,
        user_id: &str,
        mentor_id: &str,
    ) -> Result<u64, AppError> {
        let cursor = self
            .chats()
            .find(doc! { "user_id": user_id, "mentor_id": mentor_id }, None)
            .await
            .map_err(AppError::from)?;
        let chats: Vec<Chat> = cursor.try_collect().await.map_err(AppError::from)?;

        let chat_ids: Vec<String> = chats.iter().map(|c| c.id.clone()).collect();
        if !chat_ids.is_empty() {
            self.messages()
                .delete_many(doc! { "chat_id": { "$in": chat_ids.clone() } }, None)
                .await
                .map_err(AppError::from)?;
            self.chats()
                .delete_many(doc! { "_id": { "$in": chat_ids.clone() } }, None)
                .await
                .map_err(AppError::from)?;
        }

        self.memories()
            .delete_one(doc! { "user_id": user_id, "mentor_id": mentor_id }, None)
            .await
            .map_err(AppError::from)?;

        Ok(chat_ids.len() as u64)
    }

    // Message operations

    pub async fn get_message(&self, message_id: &str) -> Result<Option<Message>, AppError> {
        self.messages()
            .find_one(doc! { "_id": message_id }, None)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();

        let cursor = self
            .messages()
            .find(doc! { "chat_id": chat_id }, options)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    // Memory operations

    pub async fn list_memories(
        &self,
        user_id: Option<&str>,
        mentor_id: Option<&str>,
    ) -> Result<Vec<Memory>, AppError> {
        let mut filter = doc! {};
        if let Some(user_id) = user_id {
            filter.insert("user_id", user_id);
        }
        if let Some(mentor_id) = mentor_id {
            filter.insert("mentor_id", mentor_id);
        }

        let options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .build();

        let cursor = self
            .memories()
            .find(filter, options)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    // Document operations

    pub async fn insert_document(&self, document: &KnowledgeDocument) -> Result<(), AppError> {
        self.documents()
            .insert_one(document, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn get_document(
        &self,
        document_id: &str,
    ) -> Result<Option<KnowledgeDocument>, AppError> {
        self.documents()
            .find_one(doc! { "_id": document_id }, None)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_active_documents(
        &self,
        mentor_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();

        let cursor = self
            .documents()
            .find(doc! { "mentor_id": mentor_id, "is_active": true }, options)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    pub async fn set_document_active(
        &self,
        document_id: &str,
        active: bool,
    ) -> Result<(), AppError> {
        self.documents()
            .update_one(
                doc! { "_id": document_id },
                doc! { "$set": { "is_active": active } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    // Feedback operations

    pub async fn insert_feedback(&self, feedback: &Feedback) -> Result<(), AppError> {
        self.feedback()
            .insert_one(feedback, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn list_feedback(&self) -> Result<Vec<Feedback>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .feedback()
            .find(doc! {}, options)
            .await
            .map_err(AppError::from)?;
        cursor.try_collect().await.map_err(AppError::from)
    }

    pub async fn set_feedback_resolved(
        &self,
        feedback_id: &str,
        resolved: bool,
    ) -> Result<bool, AppError> {
        let result = self
            .feedback()
            .update_one(
                doc! { "_id": feedback_id },
                doc! { "$set": { "is_resolved": resolved } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete_feedback(&self, feedback_id: &str) -> Result<bool, AppError> {
        let result = self
            .feedback()
            .delete_one(doc! { "_id": feedback_id }, None)
            .await
            .map_err(AppError::from)?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ConversationStore for MongoDb {
    async fn find_mentor(&self, mentor_id: &str) -> Result<Option<Mentor>, AppError> {
        self.get_mentor(mentor_id).await
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_user(user_id).await
    }

    async fn find_chat(&self, chat_id: &str) -> Result<Option<Chat>, AppError> {
        self.get_chat(chat_id).await
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, AppError> {
        self.list_chat_messages(chat_id).await
    }

    async fn count_chat_messages(&self, chat_id: &str) -> Result<u64, AppError> {
        self.messages()
            .count_documents(doc! { "chat_id": chat_id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.messages()
            .insert_one(message, None)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_message_content(&self, message_id: &str, content: &str) -> Result<(), AppError> {
        self.messages()
            .update_one(
                doc! { "_id": message_id },
                doc! { "$set": { "content": content } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn touch_chat(&self, chat_id: &str) -> Result<(), AppError> {
        let now = BsonDateTime::now();
        self.chats()
            .update_one(
                doc! { "_id": chat_id },
                doc! { "$set": { "last_message_at": now, "updated_at": now } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn set_chat_title_if_matches(
        &self,
        chat_id: &str,
        expected_title: &str,
        new_title: &str,
    ) -> Result<bool, AppError> {
        let result = self
            .chats()
            .update_one(
                doc! { "_id": chat_id, "title": expected_title },
                doc! { "$set": { "title": new_title, "updated_at": BsonDateTime::now() } },
                None,
            )
            .await
            .map_err(AppError::from)?;
        Ok(result.matched_count > 0)
    }

    async fn find_memory(
        &self,
        user_id: &str,
        mentor_id: &str,
    ) -> Result<Option<Memory>, AppError> {
        self.memories()
            .find_one(doc! { "user_id": user_id, "mentor_id": mentor_id }, None)
            .await
            .map_err(AppError::from)
    }

    async fn upsert_memory(
        &self,
        user_id: &str,
        mentor_id: &str,
        key_points: &[String],
        conversation_count: i32,
    ) -> Result<(), AppError> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.memories()
            .update_one(
                doc! { "user_id": user_id, "mentor_id": mentor_id },
                doc! {
                    "$set": {
                        "key_points": key_points.to_vec(),
                        "conversation_count": conversation_count,
                        "updated_at": BsonDateTime::now(),
                    },
                    "$setOnInsert": { "_id": Uuid::new_v4().to_string() },
                },
                options,
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn active_documents(
        &self,
        mentor_id: &str,
    ) -> Result<Vec<KnowledgeDocument>, AppError> {
        self.list_active_documents(mentor_id).await
    }
}
