use chrono::Utc;
use portrait_api::auth::{JwtClaims, JwtVerifier};
use uuid::Uuid;

/// Sign a one-hour token for `user_id`.
pub fn mint_token(jwt: &JwtVerifier, user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    jwt.issue(&JwtClaims {
        sub: user_id,
        exp: now + 3600,
        iat: now,
        email: Some("test@example.com".to_string()),
    })
    .expect("Failed to sign test token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
