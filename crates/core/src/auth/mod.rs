mod none;
mod shared_secret;
mod traits;
mod types;

pub use none::*;
pub use shared_secret::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::SharedSecret => {
            let secret = config
                .secret
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "secret must be set when using shared_secret auth method".to_string(),
                    )
                })?;
            Ok(Box::new(SharedSecretAuthenticator::new(secret)))
        }
    }
}
