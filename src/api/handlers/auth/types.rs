//! Request/response types for the credential endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRequestBody {
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn signup_request_round_trips() -> Result<()> {
        let request: SignupRequest = serde_json::from_value(json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "secret1",
        }))?;
        assert_eq!(request.username, "alice");
        assert_eq!(request.email, "a@x.com");
        Ok(())
    }

    #[test]
    fn reset_password_uses_camel_case_field() -> Result<()> {
        let request: ResetPasswordRequest = serde_json::from_value(json!({
            "token": "abc",
            "newPassword": "secret1",
        }))?;
        assert_eq!(request.new_password.as_deref(), Some("secret1"));

        let value = serde_json::to_value(&request)?;
        assert!(value.get("newPassword").is_some());
        Ok(())
    }

    #[test]
    fn reset_request_tolerates_missing_email() -> Result<()> {
        let request: ResetRequestBody = serde_json::from_value(json!({}))?;
        assert!(request.email.is_none());
        Ok(())
    }
}
