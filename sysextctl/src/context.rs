//! Cancellation and deadline context for network operations.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{SysextError, SysextResult};

/// Cancellation token plus optional deadline, passed to every network call.
///
/// Cloning shares the token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Give up once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The shared cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> SysextResult<()> {
        if self.token.is_cancelled() {
            return Err(SysextError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SysextError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes() {
        assert!(OpContext::new().check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = OpContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(matches!(clone.check(), Err(SysextError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = OpContext::new().with_timeout(Duration::ZERO);
        assert!(matches!(ctx.check(), Err(SysextError::DeadlineExceeded)));
    }

    #[test]
    fn test_external_token() {
        let token = CancellationToken::new();
        let ctx = OpContext::with_token(token.clone());
        token.cancel();
        assert!(ctx.check().is_err());
    }
}
