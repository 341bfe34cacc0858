//! Weaving targets and running the advice contract around them.
//!
//! # One call, start to finish
//!
//! ```text
//! Before advice (ascending priority)
//!        ↓
//! Around advice, outermost first ── proceed() ──► ... ──► target
//!        ↓                        (or the target directly if no Around)
//! ┌ returned → AfterReturning (descending priority)
//! └ threw    → AfterThrowing  (descending priority)
//!        ↓
//! After advice (descending priority), whatever the outcome
//! ```
//!
//! Advice handlers that fail are not swallowed: the failure becomes the
//! caller's result and the rest of that call's advice is skipped.

use std::cmp::Reverse;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Dispatch, debug, debug_span, info};

use crate::error::Fault;
use crate::middleware::advice::{AdviceBinding, AdviceKind};
use crate::middleware::context::{InvocationContext, Phase, ProceedingJoinPoint, TargetFn};
use crate::middleware::registry::InterceptorRegistry;
use crate::middleware::signature::MethodSignature;

/// Wraps targets with the advice a frozen registry resolves for them.
#[derive(Clone)]
pub struct Weaver {
    registry: Arc<InterceptorRegistry>,
    dispatch: Option<Dispatch>,
}

impl Weaver {
    pub fn new(registry: Arc<InterceptorRegistry>) -> Self {
        Self { registry, dispatch: None }
    }

    /// Routes every event of the advised calls to `dispatch` instead of the
    /// global subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn registry(&self) -> &InterceptorRegistry {
        &self.registry
    }

    /// Resolves advice for `signature` once and returns the advised target.
    ///
    /// `target_id` identifies the wrapped object in join-point output.
    pub fn weave<F>(&self, signature: MethodSignature, target_id: &str, target: F) -> Advised
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        let chain = self.registry.resolve(&signature);
        let of_kind = |kind: AdviceKind| -> Vec<AdviceBinding> {
            chain.iter().filter(|b| b.kind() == kind).cloned().collect()
        };
        // descending priority, ties in registration order
        let on_exit = |kind: AdviceKind| -> Vec<AdviceBinding> {
            let mut bindings = of_kind(kind);
            bindings.sort_by_key(|b| Reverse(b.priority()));
            bindings
        };

        let woven = Woven {
            target_id: target_id.into(),
            proxy_id: format!("Advised<{target_id}>").into(),
            before: of_kind(AdviceKind::Before),
            around: of_kind(AdviceKind::Around),
            after_returning: on_exit(AdviceKind::AfterReturning),
            after_throwing: on_exit(AdviceKind::AfterThrowing),
            after: on_exit(AdviceKind::After),
            target: Box::new(target),
            dispatch: self.dispatch.clone(),
            signature: Arc::new(signature),
        };

        info!(join_point = %woven.signature, advice = chain.len(), "woven");
        Advised(Arc::new(woven))
    }
}

/// An advised target. Cloning shares the resolved chain.
#[derive(Clone)]
pub struct Advised(Arc<Woven>);

struct Woven {
    signature: Arc<MethodSignature>,
    target_id: Arc<str>,
    proxy_id: Arc<str>,
    before: Vec<AdviceBinding>,
    around: Vec<AdviceBinding>,
    after_returning: Vec<AdviceBinding>,
    after_throwing: Vec<AdviceBinding>,
    after: Vec<AdviceBinding>,
    target: Box<TargetFn>,
    dispatch: Option<Dispatch>,
}

enum Outcome {
    Returned(Option<Value>),
    Threw(Fault),
}

impl Advised {
    pub fn signature(&self) -> &MethodSignature {
        &self.0.signature
    }

    /// Runs one join point on the calling thread.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, Fault> {
        match &self.0.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.run(args)),
            None => self.run(args),
        }
    }

    fn run(&self, args: Vec<Value>) -> Result<Value, Fault> {
        let w = &*self.0;
        let span = debug_span!(
            "join_point",
            declaring_type = w.signature.declaring_type(),
            method = w.signature.name(),
        );
        let _enter = span.enter();

        let mut ctx = InvocationContext::new(
            Arc::clone(&w.target_id),
            Arc::clone(&w.proxy_id),
            Arc::clone(&w.signature),
            args,
        );

        for binding in &w.before {
            binding.on_join_point(&ctx)?;
        }

        ctx.enter(Phase::Invoking);
        let outcome = match w.around.split_first() {
            None => match (w.target)(&ctx.args) {
                Ok(value) => Outcome::Returned(Some(value)),
                Err(fault) => Outcome::Threw(fault),
            },
            Some((outermost, inner)) => {
                let result = {
                    let mut pjp = ProceedingJoinPoint::new(&mut ctx, inner, &*w.target);
                    outermost.on_around(&mut pjp)
                };
                match result {
                    Ok(()) => Outcome::Returned(ctx.return_value.take()),
                    Err(fault) if ctx.error.is_some() => Outcome::Threw(fault),
                    // no target error behind it: the advice itself failed
                    Err(fault) => return Err(fault),
                }
            }
        };

        match outcome {
            Outcome::Returned(value) => {
                ctx.error = None;
                ctx.return_value = value;
                ctx.enter(Phase::Returned);
                if let Some(value) = &ctx.return_value {
                    for binding in &w.after_returning {
                        binding.on_returning(&ctx, value)?;
                    }
                }
                for binding in &w.after {
                    binding.on_join_point(&ctx)?;
                }
                ctx.enter(Phase::Completed);
                Ok(ctx.return_value.take().unwrap_or(Value::Null))
            }
            Outcome::Threw(fault) => {
                debug!(error = %fault, "join point threw");
                ctx.return_value = None;
                ctx.error = Some(fault.clone());
                ctx.enter(Phase::Threw);
                for binding in &w.after_throwing {
                    binding.on_throwing(&ctx, &fault)?;
                }
                for binding in &w.after {
                    binding.on_join_point(&ctx)?;
                }
                ctx.enter(Phase::Completed);
                Err(fault)
            }
        }
    }
}
