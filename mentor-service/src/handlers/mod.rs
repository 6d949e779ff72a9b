pub mod admin;
pub mod chats;
pub mod demo;
pub mod documents;
pub mod feedback;
pub mod health;
pub mod images;
pub mod mentors;
pub mod users;

use crate::services::MongoDb;
use service_core::error::AppError;

/// Admin gate shared by moderation handlers: the caller's profile must
/// carry the admin flag.
pub(crate) async fn require_admin(db: &MongoDb, user_id: &str) -> Result<(), AppError> {
    let user = db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unknown user")))?;

    if !user.is_admin {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Administrator access required"
        )));
    }

    Ok(())
}
