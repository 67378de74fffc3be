//! Middleware chain and invocation cursor.
//!
//! The chain is an immutable slice of middlewares shared across
//! requests; each request gets its own [`Invocation`] holding a cursor
//! into the slice. A middleware either short-circuits by returning a
//! result, or calls [`Invocation::proceed`] exactly once to hand
//! control to the next link. The terminal link runs the action.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::DaedalusResult;
use crate::result::ActionResult;

/// One link in the request pipeline.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        "middleware"
    }

    /// Handles the request. Call `invocation.proceed()` to continue
    /// down the chain, or return early to short-circuit.
    async fn execute(&self, invocation: Invocation) -> DaedalusResult<ActionResult>;
}

/// The innermost link: binds, validates, authorizes and invokes the
/// action once every middleware has proceeded.
#[async_trait]
pub trait Terminal: Send + Sync + 'static {
    /// Runs the action for the given context.
    async fn run(&self, ctx: RequestContext) -> DaedalusResult<ActionResult>;
}

/// A request's position in the middleware chain.
///
/// `proceed` consumes the invocation, so a middleware cannot continue
/// the chain twice.
pub struct Invocation {
    chain: Arc<[Arc<dyn Middleware>]>,
    cursor: usize,
    terminal: Arc<dyn Terminal>,
    ctx: RequestContext,
}

impl Invocation {
    /// Creates an invocation at the head of the chain.
    #[must_use]
    pub fn new(
        chain: Arc<[Arc<dyn Middleware>]>,
        terminal: Arc<dyn Terminal>,
        ctx: RequestContext,
    ) -> Self {
        Self {
            chain,
            cursor: 0,
            terminal,
            ctx,
        }
    }

    /// The request context.
    #[must_use]
    pub fn ctx(&self) -> &RequestContext {
        &self.ctx
    }

    /// Mutable access to the request context, so a middleware can
    /// attach identity or rewrite the request before proceeding.
    pub fn ctx_mut(&mut self) -> &mut RequestContext {
        &mut self.ctx
    }

    /// Hands control to the next middleware, or to the terminal when
    /// the chain is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates whatever the rest of the chain returns.
    pub async fn proceed(mut self) -> DaedalusResult<ActionResult> {
        if self.cursor < self.chain.len() {
            let next = self.chain[self.cursor].clone();
            self.cursor += 1;
            tracing::trace!(middleware = next.name(), "entering middleware");
            next.execute(self).await
        } else {
            let terminal = self.terminal.clone();
            terminal.run(self.ctx).await
        }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("cursor", &self.cursor)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        tag: &'static str,
        log: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.tag
        }

        async fn execute(&self, invocation: Invocation) -> DaedalusResult<ActionResult> {
            self.log.lock().push(format!("{}:before", self.tag));
            let result = invocation.proceed().await;
            self.log.lock().push(format!("{}:after", self.tag));
            result
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn execute(&self, _invocation: Invocation) -> DaedalusResult<ActionResult> {
            Ok(ActionResult::from_body(serde_json::json!("stopped")))
        }
    }

    struct CountingTerminal {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Terminal for CountingTerminal {
        async fn run(&self, _ctx: RequestContext) -> DaedalusResult<ActionResult> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(ActionResult::from_body(serde_json::json!("action")))
        }
    }

    fn chain_of(mws: Vec<Arc<dyn Middleware>>) -> Arc<[Arc<dyn Middleware>]> {
        mws.into()
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_around_terminal() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = chain_of(vec![
            Arc::new(Recorder {
                tag: "outer",
                log: log.clone(),
            }),
            Arc::new(Recorder {
                tag: "inner",
                log: log.clone(),
            }),
        ]);
        let terminal = Arc::new(CountingTerminal { hits: hits.clone() });
        let invocation =
            Invocation::new(chain, terminal, RequestContext::builder().build());

        let result = invocation.proceed().await.expect("result");
        assert_eq!(result.body(), Some(&serde_json::json!("action")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            *log.lock(),
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_terminal() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = chain_of(vec![Arc::new(ShortCircuit)]);
        let terminal = Arc::new(CountingTerminal { hits: hits.clone() });
        let invocation =
            Invocation::new(chain, terminal, RequestContext::builder().build());

        let result = invocation.proceed().await.expect("result");
        assert_eq!(result.body(), Some(&serde_json::json!("stopped")));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_goes_straight_to_terminal() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = chain_of(Vec::new());
        let terminal = Arc::new(CountingTerminal { hits: hits.clone() });
        let invocation =
            Invocation::new(chain, terminal, RequestContext::builder().build());

        invocation.proceed().await.expect("result");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
