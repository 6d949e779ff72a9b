use crate::error::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate an HMAC-SHA256 signature over an arbitrary payload string.
pub fn generate_signature(secret: &str, payload: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(payload.as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify an HMAC-SHA256 signature using constant-time comparison.
pub fn verify_signature(
    secret: &str,
    payload: &str,
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(secret, payload)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

/// Sign an expiring image download URL.
///
/// Payload format: `{image_id}|{expires}` where `expires` is a unix
/// timestamp in seconds.
pub fn generate_image_signature(
    image_id: &str,
    expires: i64,
    secret: &str,
) -> Result<String, anyhow::Error> {
    generate_signature(secret, &format!("{}|{}", image_id, expires))
}

/// Validate a signed image download URL: the expiry must be in the future
/// and the signature must match.
pub fn validate_image_signature(
    image_id: &str,
    signature: &str,
    expires: i64,
    secret: &str,
) -> Result<(), AppError> {
    if expires < chrono::Utc::now().timestamp() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Download link has expired"
        )));
    }

    let valid = verify_signature(secret, &format!("{}|{}", image_id, expires), signature)
        .map_err(AppError::InternalError)?;

    if !valid {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid download signature"
        )));
    }

    Ok(())
}
