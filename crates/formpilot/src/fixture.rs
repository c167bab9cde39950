//! Scoped session acquisition.
//!
//! One session serves one run and is closed on every exit path, success or
//! failure. Teardown is async, so it cannot live in `Drop`; [`run_scoped`]
//! awaits it after the work completes, and [`SessionGuard`] warns when a
//! session is dropped without having been closed.

use crate::driver::BrowserSession;
use crate::result::FormResult;
use std::future::Future;
use std::pin::Pin;

/// Future borrowing a scoped session
pub type ScopedFuture<'s, T> = Pin<Box<dyn Future<Output = T> + 's>>;

/// Owns a session until it is explicitly closed
pub struct SessionGuard<S: BrowserSession> {
    session: S,
    closed: bool,
}

impl<S: BrowserSession> SessionGuard<S> {
    /// Take ownership of an open session
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    /// Shared access to the session
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Exclusive access to the session
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Close the session
    pub async fn close(mut self) -> FormResult<()> {
        self.closed = true;
        self.session.close().await
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("session dropped without being closed");
        }
    }
}

impl<S: BrowserSession> std::fmt::Debug for SessionGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Run `work` against `session`, then close the session whatever the outcome.
///
/// A teardown failure is logged and never replaces the work's result.
pub async fn run_scoped<S, T, F>(session: S, work: F) -> T
where
    S: BrowserSession,
    F: for<'s> FnOnce(&'s mut S) -> ScopedFuture<'s, T>,
{
    let mut guard = SessionGuard::new(session);
    let value = work(guard.session_mut()).await;
    match guard.close().await {
        Ok(()) => tracing::debug!("session closed"),
        Err(err) => tracing::warn!(error = %err, "session teardown failed"),
    }
    value
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::ScriptedSession;
    use crate::result::FormError;

    #[tokio::test]
    async fn test_closes_after_success() {
        let session = ScriptedSession::new();
        let observer = session.clone();
        let value = run_scoped(session, |s| {
            Box::pin(async move {
                s.navigate("http://localhost:3000/").await?;
                Ok::<_, FormError>(7)
            })
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert!(observer.is_closed());
    }

    #[tokio::test]
    async fn test_closes_after_failure() {
        let session = ScriptedSession::new();
        let observer = session.clone();
        let result: FormResult<()> = run_scoped(session, |_s| {
            Box::pin(async { Err(FormError::session("boom")) })
        })
        .await;
        assert!(result.is_err());
        assert!(observer.is_closed());
    }

    #[tokio::test]
    async fn test_guard_close() {
        let guard = SessionGuard::new(ScriptedSession::new());
        let observer = guard.session().clone();
        guard.close().await.unwrap();
        assert!(observer.is_closed());
    }
}
