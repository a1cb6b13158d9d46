//! Shared-secret authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Query parameter carrying the shared secret.
pub const SECRET_QUERY_PARAM: &str = "secret";

/// Authenticator that compares a caller-supplied secret with the configured one.
///
/// Accepts the secret in either:
/// - `?secret=<value>` query parameter (what cron triggers use)
/// - `X-API-Key: <value>` header
pub struct SharedSecretAuthenticator {
    expected: String,
}

impl SharedSecretAuthenticator {
    pub fn new(secret: String) -> Self {
        Self { expected: secret }
    }

    fn extract_secret<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        request
            .query
            .get(SECRET_QUERY_PARAM)
            .or_else(|| request.headers.get("x-api-key"))
            .map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for SharedSecretAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_secret(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected.as_bytes()) {
            Ok(Identity {
                caller: "secret_holder".to_string(),
                method: "shared_secret".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid secret".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "shared_secret"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &[(&str, &str)], headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_query_secret_valid() {
        let auth = SharedSecretAuthenticator::new("s3cret".to_string());
        let identity = auth
            .authenticate(&request(&[("secret", "s3cret")], &[]))
            .await
            .unwrap();

        assert_eq!(identity.method, "shared_secret");
    }

    #[tokio::test]
    async fn test_header_secret_valid() {
        let auth = SharedSecretAuthenticator::new("s3cret".to_string());
        let identity = auth
            .authenticate(&request(&[], &[("X-API-Key", "s3cret")]))
            .await
            .unwrap();

        assert_eq!(identity.caller, "secret_holder");
    }

    #[tokio::test]
    async fn test_query_takes_precedence_over_header() {
        let auth = SharedSecretAuthenticator::new("s3cret".to_string());
        let result = auth
            .authenticate(&request(&[("secret", "wrong")], &[("X-API-Key", "s3cret")]))
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_invalid_secret() {
        let auth = SharedSecretAuthenticator::new("s3cret".to_string());
        let result = auth.authenticate(&request(&[("secret", "nope")], &[])).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let auth = SharedSecretAuthenticator::new("s3cret".to_string());
        let result = auth.authenticate(&request(&[], &[])).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
