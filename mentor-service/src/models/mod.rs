//! Domain models for the mentor service.

pub mod chat;
pub mod document;
pub mod feedback;
pub mod memory;
pub mod mentor;
pub mod message;
pub mod user;

pub use chat::Chat;
pub use document::{DocumentSource, KnowledgeDocument};
pub use feedback::Feedback;
pub use memory::Memory;
pub use mentor::Mentor;
pub use message::{Message, MessageRole};
pub use user::UserProfile;
