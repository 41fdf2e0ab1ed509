//! Reentrancy guard
//!
//! One flag per router instance. Acquiring it yields a token; the flag is
//! cleared when the token drops, on success, error and unwind alike. A held
//! flag fails the second caller immediately, nothing waits.

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual exclusion over the router's external-call window
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Proof that the guard is held
#[derive(Debug)]
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct ReentrancyToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    /// Create an open guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or fail with `ReentrantCall` if it is held
    pub fn enter(&self) -> Result<ReentrancyToken<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ReentrantCall)?;
        Ok(ReentrancyToken { guard: self })
    }

    /// Whether a guarded call is in flight
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    fn exit(&self) {
        self.entered.store(false, Ordering::Release);
    }
}

impl Drop for ReentrancyToken<'_> {
    fn drop(&mut self) {
        self.guard.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_enter_fails() {
        let guard = ReentrancyGuard::new();
        let token = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert!(matches!(guard.enter(), Err(Error::ReentrantCall)));
        drop(token);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        fn guarded(guard: &ReentrancyGuard) -> Result<()> {
            let _token = guard.enter()?;
            Err(Error::InvalidCall("boom".to_string()))
        }

        let guard = ReentrancyGuard::new();
        assert!(guarded(&guard).is_err());
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = ReentrancyGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _token = guard.enter().unwrap();
            panic!("executor blew up");
        }));
        assert!(result.is_err());
        assert!(!guard.is_entered());
    }
}
