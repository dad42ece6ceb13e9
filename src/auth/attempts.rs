//! Per-principal failed-attempt accounting and lockout.
//!
//! The counter is monotonic with a reset-on-trip policy: when the
//! incremented value reaches the threshold the counter resets to zero and a
//! lock is imposed, giving the principal a fresh window after each lock
//! rather than a sliding one. Locks expire lazily at read time.

use chrono::Duration;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::clock::Clock;
use super::error::AuthError;
use super::models::{AttemptOutcome, Principal, PrincipalKind};
use super::repo::PrincipalStore;

const PARENT_MAX_ATTEMPTS: i32 = 5;
const CHILD_MAX_ATTEMPTS: i32 = 10;
const LOCK_MINUTES: i64 = 10;

/// Lockout parameters, fixed per principal kind.
#[derive(Clone, Copy, Debug)]
pub struct AttemptPolicy {
    pub max_attempts: i32,
    pub lock_duration: Duration,
}

impl AttemptPolicy {
    #[must_use]
    pub fn for_kind(kind: PrincipalKind) -> Self {
        let max_attempts = match kind {
            PrincipalKind::Parent => PARENT_MAX_ATTEMPTS,
            PrincipalKind::Child => CHILD_MAX_ATTEMPTS,
        };
        Self {
            max_attempts,
            lock_duration: Duration::minutes(LOCK_MINUTES),
        }
    }
}

pub struct AttemptGuard {
    principals: Arc<dyn PrincipalStore>,
    clock: Arc<dyn Clock>,
    policy: AttemptPolicy,
}

impl AttemptGuard {
    #[must_use]
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        clock: Arc<dyn Clock>,
        policy: AttemptPolicy,
    ) -> Self {
        Self {
            principals,
            clock,
            policy,
        }
    }

    /// Refuse verification while a lock is in force. Side-effect free; an
    /// elapsed `locked_until` is treated as absent.
    pub fn assert_not_locked(&self, principal: &Principal) -> Result<(), AuthError> {
        if let Some(locked_until) = principal.locked_until {
            if locked_until > self.clock.now() {
                return Err(AuthError::Locked);
            }
        }
        Ok(())
    }

    /// Count one failure. Tripping the threshold resets the counter and
    /// imposes the lock; both happen in a single store call.
    pub async fn record_failed_attempt(&self, principal_id: Uuid) -> Result<(), AuthError> {
        let lock_until = self.clock.now() + self.policy.lock_duration;
        let outcome = self
            .principals
            .record_failure(principal_id, self.policy.max_attempts, lock_until)
            .await?;
        if outcome == AttemptOutcome::Locked {
            warn!(%principal_id, "lockout imposed after repeated failed attempts");
        }
        Ok(())
    }

    /// Reset the counter and clear any lock. Called only after a verified
    /// success.
    pub async fn clear_attempts(&self, principal_id: Uuid) -> Result<(), AuthError> {
        self.principals.clear_attempts(principal_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AttemptPolicy, PrincipalKind};

    #[test]
    fn policy_thresholds_per_kind() {
        let parent = AttemptPolicy::for_kind(PrincipalKind::Parent);
        assert_eq!(parent.max_attempts, 5);
        assert_eq!(parent.lock_duration.num_minutes(), 10);

        let child = AttemptPolicy::for_kind(PrincipalKind::Child);
        assert_eq!(child.max_attempts, 10);
        assert_eq!(child.lock_duration.num_minutes(), 10);
    }
}
