use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Failure envelope. `error` is a stable machine-readable code.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// A mutation payload: the entity fields plus the optional step-up PIN.
#[derive(Debug, Deserialize)]
pub struct Guarded<T> {
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(flatten)]
    pub input: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct PinRequest {
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse<T> {
    pub status: &'static str,
    pub items: Vec<T>,
}

impl<T> DeleteResponse<T> {
    pub const fn ok(items: Vec<T>) -> Self {
        Self { status: "ok", items }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub const fn ok() -> Self {
        Self { status: "ok" }
    }
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseInput;

    #[test]
    fn guarded_payload_splits_pin_from_fields() {
        let payload: Guarded<CourseInput> = serde_json::from_str(
            r#"{"name":"Math","price":99.5,"pin":"1234","_csrf_token":"abc"}"#,
        )
        .unwrap();

        assert_eq!(payload.pin.as_deref(), Some("1234"));
        assert_eq!(payload.input.name.as_deref(), Some("Math"));
        assert_eq!(payload.input.price, Some(99.5));
    }

    #[test]
    fn error_body_omits_empty_parts() {
        let body = ErrorBody {
            success: false,
            error: "not_found".to_string(),
            message: None,
            fields: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "success": false, "error": "not_found" })
        );
    }
}
