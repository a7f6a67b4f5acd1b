//! Cooperative cancellation tokens.
//!
//! A [`CancelToken`] is a cheaply cloneable, thread-safe handle that the
//! execution watchdog polls to decide when to kill a running command.
//! Tokens come in three leaf flavors (manual trigger, deadline, arbitrary
//! predicate) and can be composed with [`CancelToken::or`] so that the
//! first sub-token to fire cancels the whole composition while keeping
//! its identity for error reporting.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A pollable cancellation handle.
///
/// Clones share the same underlying state, so a token handed to
/// [`RunOptions::with_token`](crate::RunOptions::with_token) can still be
/// tripped or inspected by the caller.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    kind: Kind,
}

enum Kind {
    Manual(AtomicBool),
    Deadline { limit: Duration, deadline: Instant },
    Condition(Box<dyn Fn() -> bool + Send + Sync>),
    Any(CancelToken, CancelToken),
}

/// Which token fired, as re-checked after a cancelled run.
#[derive(Debug, Clone)]
pub enum CancelCause {
    /// A deadline token fired; `limit` is the duration it was created with.
    Timeout { limit: Duration },
    /// A manual or predicate token fired; carries the firing token itself.
    Token(CancelToken),
}

impl CancelToken {
    fn from_kind(kind: Kind) -> Self {
        Self {
            inner: Arc::new(Inner { kind }),
        }
    }

    /// A token that fires once [`cancel`](Self::cancel) is called.
    pub fn manual() -> Self {
        Self::from_kind(Kind::Manual(AtomicBool::new(false)))
    }

    /// A token that fires once `limit` has elapsed from this call.
    pub fn after(limit: Duration) -> Self {
        Self::from_kind(Kind::Deadline {
            limit,
            deadline: Instant::now() + limit,
        })
    }

    /// A token that fires whenever `predicate` returns true.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::from_kind(Kind::Condition(Box::new(predicate)))
    }

    /// Compose two tokens; the result fires as soon as either does.
    ///
    /// When both have fired by the time the cause is re-checked, `self`
    /// wins: sub-tokens are inspected in composition order.
    pub fn or(&self, other: &CancelToken) -> CancelToken {
        Self::from_kind(Kind::Any(self.clone(), other.clone()))
    }

    /// Trip a manual token. Recurses into compositions; deadline and
    /// predicate tokens are unaffected.
    pub fn cancel(&self) {
        match &self.inner.kind {
            Kind::Manual(fired) => fired.store(true, Ordering::SeqCst),
            Kind::Any(left, right) => {
                left.cancel();
                right.cancel();
            }
            Kind::Deadline { .. } | Kind::Condition(_) => {}
        }
    }

    /// Has this token (or any sub-token) fired?
    pub fn is_fired(&self) -> bool {
        match &self.inner.kind {
            Kind::Manual(fired) => fired.load(Ordering::SeqCst),
            Kind::Deadline { deadline, .. } => Instant::now() >= *deadline,
            Kind::Condition(predicate) => predicate(),
            Kind::Any(left, right) => left.is_fired() || right.is_fired(),
        }
    }

    /// The first fired sub-token in composition order, or `None` when
    /// nothing has fired.
    pub fn fired_cause(&self) -> Option<CancelCause> {
        match &self.inner.kind {
            Kind::Any(left, right) => left.fired_cause().or_else(|| right.fired_cause()),
            Kind::Deadline { limit, .. } if self.is_fired() => {
                Some(CancelCause::Timeout { limit: *limit })
            }
            Kind::Manual(_) | Kind::Condition(_) if self.is_fired() => {
                Some(CancelCause::Token(self.clone()))
            }
            _ => None,
        }
    }

    /// Identity comparison: do both handles point at the same token state?
    pub fn ptr_eq(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner.kind {
            Kind::Manual(_) => "manual",
            Kind::Deadline { .. } => "deadline",
            Kind::Condition(_) => "condition",
            Kind::Any(_, _) => "composed",
        };
        f.debug_struct("CancelToken")
            .field("kind", &kind)
            .field("fired", &self.is_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_token_fires_on_cancel() {
        let token = CancelToken::manual();
        assert!(!token.is_fired());

        token.cancel();
        assert!(token.is_fired());
    }

    #[test]
    fn test_manual_token_clones_share_state() {
        let token = CancelToken::manual();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_fired());
        assert!(token.ptr_eq(&clone));
    }

    #[test]
    fn test_deadline_token_fires_after_limit() {
        let token = CancelToken::after(Duration::from_millis(10));
        assert!(!token.is_fired());

        std::thread::sleep(Duration::from_millis(20));
        assert!(token.is_fired());
    }

    #[test]
    fn test_condition_token_follows_predicate() {
        let flag = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&flag);
        let token = CancelToken::when(move || observed.load(Ordering::SeqCst));

        assert!(!token.is_fired());
        flag.store(true, Ordering::SeqCst);
        assert!(token.is_fired());
    }

    #[test]
    fn test_composed_token_fires_when_either_does() {
        let manual = CancelToken::manual();
        let never = CancelToken::when(|| false);
        let composed = never.or(&manual);

        assert!(!composed.is_fired());
        manual.cancel();
        assert!(composed.is_fired());
    }

    #[test]
    fn test_fired_cause_identifies_the_firing_token() {
        let manual = CancelToken::manual();
        let deadline = CancelToken::after(Duration::from_secs(3600));
        let composed = manual.or(&deadline);

        assert!(composed.fired_cause().is_none());

        manual.cancel();
        match composed.fired_cause() {
            Some(CancelCause::Token(token)) => assert!(token.ptr_eq(&manual)),
            other => panic!("unexpected cause: {:?}", other),
        }
    }

    #[test]
    fn test_fired_cause_reports_timeout_flavor() {
        let manual = CancelToken::manual();
        let deadline = CancelToken::after(Duration::from_millis(5));
        let composed = manual.or(&deadline);

        std::thread::sleep(Duration::from_millis(15));
        match composed.fired_cause() {
            Some(CancelCause::Timeout { limit }) => {
                assert_eq!(limit, Duration::from_millis(5));
            }
            other => panic!("unexpected cause: {:?}", other),
        }
    }

    #[test]
    fn test_composition_order_decides_ties() {
        let first = CancelToken::manual();
        let second = CancelToken::manual();
        first.cancel();
        second.cancel();

        match first.or(&second).fired_cause() {
            Some(CancelCause::Token(token)) => assert!(token.ptr_eq(&first)),
            other => panic!("unexpected cause: {:?}", other),
        }
    }

    #[test]
    fn test_cancel_recurses_into_composition() {
        let left = CancelToken::manual();
        let right = CancelToken::manual();
        let composed = left.or(&right);

        composed.cancel();
        assert!(left.is_fired());
        assert!(right.is_fired());
    }

    #[test]
    fn test_cancel_is_noop_for_deadline() {
        let token = CancelToken::after(Duration::from_secs(3600));
        token.cancel();
        assert!(!token.is_fired());
    }
}
