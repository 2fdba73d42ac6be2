use serde::{Deserialize, Serialize};

/// Uniform JSON response envelope.
///
/// Serializes as `{"success": bool, "message": string, "data": ...}` with
/// `data` omitted when absent.
#[must_use = "responses do nothing unless serialized"]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonResponse<T = serde_json::Value> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Optional payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonResponse<T> {
    /// Creates a successful envelope without data.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a failed envelope without data.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }
}
