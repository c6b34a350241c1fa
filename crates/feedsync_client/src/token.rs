//! Bearer-token acquisition.

use crate::error::{ClientError, ClientResult};

/// Maximum attempts before giving up on the credential provider.
pub const TOKEN_MAX_ATTEMPTS: u32 = 3;

/// Supplies bearer tokens for outgoing requests.
///
/// The executor calls this fresh before every send, so providers may
/// rotate or refresh tokens at will.
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token, or a provider-specific error message.
    fn acquire(&self) -> Result<String, String>;
}

/// A provider that always returns the same token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn acquire(&self) -> Result<String, String> {
        Ok(self.token.clone())
    }
}

/// Acquires a token, retrying up to `max_attempts` times.
///
/// Fail-fast by design: exhausting the budget yields
/// [`ClientError::TokenAcquisition`] rather than hanging.
pub(crate) fn acquire_with_retry(
    provider: &dyn TokenProvider,
    max_attempts: u32,
) -> ClientResult<String> {
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match provider.acquire() {
            Ok(token) => return Ok(token),
            Err(message) => {
                tracing::warn!(attempt, max_attempts, error = %message, "token acquisition failed");
                last_error = message;
            }
        }
    }
    Err(ClientError::TokenAcquisition {
        attempts: max_attempts,
        message: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Fails a configured number of times, then succeeds.
    struct FlakyProvider {
        failures_left: Mutex<u32>,
        calls: Mutex<u32>,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }
    }

    impl TokenProvider for FlakyProvider {
        fn acquire(&self) -> Result<String, String> {
            *self.calls.lock() += 1;
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                Err("provider offline".into())
            } else {
                Ok("jwt-token".into())
            }
        }
    }

    #[test]
    fn succeeds_first_try() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(
            acquire_with_retry(&provider, TOKEN_MAX_ATTEMPTS).unwrap(),
            "abc"
        );
    }

    #[test]
    fn two_failures_then_success() {
        let provider = FlakyProvider::new(2);
        let token = acquire_with_retry(&provider, TOKEN_MAX_ATTEMPTS).unwrap();
        assert_eq!(token, "jwt-token");
        assert_eq!(*provider.calls.lock(), 3);
    }

    #[test]
    fn three_failures_gives_up() {
        let provider = FlakyProvider::new(3);
        let err = acquire_with_retry(&provider, TOKEN_MAX_ATTEMPTS).unwrap_err();
        match err {
            ClientError::TokenAcquisition { attempts, message } => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "provider offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*provider.calls.lock(), 3);
    }
}
