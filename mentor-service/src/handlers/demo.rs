use crate::dtos::demo::{DemoChatRequest, DemoChatResponse};
use crate::services::providers::{ChatProvider, ChatTurn, CompletionRequest};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use rand::Rng;
use service_core::error::AppError;
use validator::Validate;

const DEMO_PERSONA: &str = "You are a veteran startup mentor in a demo chat on the Magister platform.\n\n\
Key traits:\n\
- Direct, ambitious, and encouraging\n\
- Push for first-principles thinking\n\
- Keep responses concise but impactful (2-3 sentences max for demo)\n\
- Make the visitor want to continue the conversation\n\n\
This is a DEMO conversation to showcase the platform. Keep responses engaging.";

/// Canned replies served when the provider is unavailable. The demo flow
/// must never surface an error dialog.
const DEMO_FALLBACKS: [&str; 5] = [
    "Interesting question! The key is to think from first principles - what are the fundamental truths you can build from?",
    "That's exactly the kind of thinking we need more of. Don't be afraid to challenge conventional wisdom.",
    "The 'impossible' is often just expensive. What would you do if cost wasn't a factor?",
    "I love the ambition in that question. The future belongs to those who think exponentially, not incrementally.",
    "Sometimes the best solution is to completely reimagine the problem. What would this look like started from scratch?",
];

/// Unauthenticated demo chat with a fixed persona. Provider failures fall
/// back to a canned mentor-voiced line instead of an error.
pub async fn demo_chat(
    State(state): State<AppState>,
    Json(payload): Json<DemoChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut turns: Vec<ChatTurn> = payload
        .history
        .iter()
        .map(|turn| {
            if turn.from_user {
                ChatTurn::user(turn.content.clone())
            } else {
                ChatTurn::assistant(turn.content.clone())
            }
        })
        .collect();
    turns.push(ChatTurn::user(payload.message.clone()));

    let request = CompletionRequest {
        model: state.config.models.chat_model.clone(),
        system: DEMO_PERSONA.to_string(),
        turns,
        temperature: 0.8,
        max_tokens: 150,
    };

    let reply = match state.provider.complete(&request).await {
        Ok(reply) => reply.trim().to_string(),
        Err(error) => {
            tracing::warn!(error = %error, "Demo completion failed, serving fallback reply");
            let index = rand::thread_rng().gen_range(0..DEMO_FALLBACKS.len());
            DEMO_FALLBACKS[index].to_string()
        }
    };

    Ok(Json(DemoChatResponse { reply }))
}
