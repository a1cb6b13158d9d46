use serde::Serialize;
use std::collections::HashMap;

/// Request information for authentication.
///
/// Header names are lowercased by the caller; query parameters are
/// already percent-decoded.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub caller: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            caller: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}
