//! Request-scoped context for query attribution.
//!
//! The request middleware establishes a context (caller ID and route) for
//! the duration of one request; the query observer reads it when buffering
//! records. The context rides a tokio task-local, so it is scoped to the
//! request's own future: concurrent requests cannot observe each other's
//! context, and nothing is left behind when the scope ends.
//!
//! Spawned background tasks do not inherit the context. Anything they need
//! must be captured into the record before spawning.

use std::future::Future;

/// Attribution carried by persistence operations inside one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated caller ID, when the request carried one.
    pub user_id: Option<String>,
    /// Request route (path and query).
    pub route: Option<String>,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Runs `fut` with `context` as the ambient request context.
pub async fn scope<F>(context: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT.scope(context, fut).await
}

/// Returns the ambient request context, or `None` outside a request scope.
#[must_use]
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_is_none_outside_a_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn scope_exposes_the_context() {
        let ctx = RequestContext {
            user_id: Some("u-1".into()),
            route: Some("/metrics/events".into()),
        };
        scope(ctx, async {
            let Some(seen) = current() else {
                panic!("expected a context inside the scope");
            };
            assert_eq!(seen.user_id.as_deref(), Some("u-1"));
            assert_eq!(seen.route.as_deref(), Some("/metrics/events"));
        })
        .await;
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn concurrent_scopes_do_not_leak_into_each_other() {
        let task = |user: &'static str| {
            tokio::spawn(scope(
                RequestContext {
                    user_id: Some(user.to_string()),
                    route: Some(format!("/r/{user}")),
                },
                async move {
                    // Yield repeatedly so the two tasks interleave.
                    for _ in 0..25 {
                        tokio::task::yield_now().await;
                        let Some(seen) = current() else {
                            panic!("context lost mid-request");
                        };
                        assert_eq!(seen.user_id.as_deref(), Some(user));
                        assert_eq!(seen.route.as_deref(), Some(format!("/r/{user}").as_str()));
                    }
                },
            ))
        };

        let (a, b) = tokio::join!(task("alice"), task("bob"));
        a.unwrap();
        b.unwrap();
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_context() {
        scope(
            RequestContext {
                user_id: Some("u-9".into()),
                route: None,
            },
            async {
                let handle = tokio::spawn(async { current().is_none() });
                assert!(handle.await.unwrap());
            },
        )
        .await;
    }
}
