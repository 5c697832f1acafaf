use serde::Serialize;
use ts_rs::TS;

/// Standard JSON envelope returned by every API endpoint.
#[derive(Debug, Clone, Serialize, TS)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiResponse;

    #[test]
    fn success_envelope_has_data_and_no_message() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, Some(42));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_envelope_has_message_and_no_data() {
        let response = ApiResponse::<()>::error("boom");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("boom"));
    }
}
