//! Per-call join point state.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::Fault;
use crate::middleware::advice::AdviceBinding;
use crate::middleware::signature::MethodSignature;

pub(crate) type TargetFn = dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync;

/// Where an invocation currently is.
///
/// ```text
/// Before ─► Invoking ─┬─► Returned ─┬─► Completed
///                     └─► Threw ────┘
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Before,
    Invoking,
    Returned,
    Threw,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before    => "before",
            Self::Invoking  => "invoking",
            Self::Returned  => "returned",
            Self::Threw     => "threw",
            Self::Completed => "completed",
        })
    }
}

/// One runtime invocation of an advised method.
///
/// Advice sees it read-only. Created when the call starts and dropped when
/// the caller gets its result.
#[derive(Debug)]
pub struct InvocationContext {
    target: Arc<str>,
    proxy: Arc<str>,
    signature: Arc<MethodSignature>,
    pub(crate) args: Vec<Value>,
    pub(crate) return_value: Option<Value>,
    pub(crate) error: Option<Fault>,
    phase: Phase,
}

impl InvocationContext {
    pub(crate) fn new(
        target: Arc<str>,
        proxy: Arc<str>,
        signature: Arc<MethodSignature>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            target,
            proxy,
            signature,
            args,
            return_value: None,
            error: None,
            phase: Phase::Before,
        }
    }

    /// Identity of the wrapped object.
    pub fn target(&self) -> &str { &self.target }
    /// Identity of the advised wrapper around it.
    pub fn this(&self) -> &str { &self.proxy }
    pub fn signature(&self) -> &MethodSignature { &self.signature }
    pub fn method_name(&self) -> &str { self.signature.name() }
    pub fn declaring_type(&self) -> &str { self.signature.declaring_type() }
    pub fn args(&self) -> &[Value] { &self.args }
    /// Set once the target (or an Around substitute) produced a value.
    pub fn return_value(&self) -> Option<&Value> { self.return_value.as_ref() }
    /// Set once the target threw.
    pub fn error(&self) -> Option<&Fault> { self.error.as_ref() }
    pub fn phase(&self) -> Phase { self.phase }

    pub(crate) fn enter(&mut self, phase: Phase) {
        trace!(from = %self.phase, to = %phase, "join point phase");
        self.phase = phase;
    }
}

/// The join point handed to Around advice.
///
/// [`proceed`](Self::proceed) runs the next Around advice in the chain, or the
/// target itself when none is left. It may be called any number of times,
/// including zero.
///
/// The value `proceed` returns is a copy. Rebinding it changes nothing the
/// caller sees; [`set_return`](Self::set_return) is the only way to
/// substitute the result.
pub struct ProceedingJoinPoint<'a> {
    ctx: &'a mut InvocationContext,
    inner: &'a [AdviceBinding],
    target: &'a TargetFn,
    proceeded: usize,
}

impl<'a> ProceedingJoinPoint<'a> {
    pub(crate) fn new(
        ctx: &'a mut InvocationContext,
        inner: &'a [AdviceBinding],
        target: &'a TargetFn,
    ) -> Self {
        Self { ctx, inner, target, proceeded: 0 }
    }

    pub fn context(&self) -> &InvocationContext {
        self.ctx
    }

    /// Continues with the current arguments.
    pub fn proceed(&mut self) -> Result<Value, Fault> {
        let args = self.ctx.args.clone();
        self.proceed_with(args)
    }

    /// Continues with `args` in place of the current arguments.
    pub fn proceed_with(&mut self, args: Vec<Value>) -> Result<Value, Fault> {
        self.ctx.args = args;
        self.proceeded += 1;

        match self.inner.split_first() {
            Some((next, rest)) => {
                // each pass reports only what the rest of the chain produced on it
                self.ctx.return_value = None;
                self.ctx.error = None;
                let mut nested = ProceedingJoinPoint::new(&mut *self.ctx, rest, self.target);
                next.on_around(&mut nested)?;
                Ok(self.ctx.return_value.clone().unwrap_or(Value::Null))
            }
            None => {
                trace!(method = self.ctx.method_name(), "invoking target");
                match (self.target)(&self.ctx.args) {
                    Ok(value) => {
                        self.ctx.error = None;
                        self.ctx.return_value = Some(value.clone());
                        Ok(value)
                    }
                    Err(fault) => {
                        self.ctx.return_value = None;
                        self.ctx.error = Some(fault.clone());
                        Err(fault)
                    }
                }
            }
        }
    }

    /// Replaces the value the caller will receive.
    pub fn set_return(&mut self, value: Value) {
        self.ctx.return_value = Some(value);
    }

    /// How many times this advice has proceeded so far.
    pub fn proceed_count(&self) -> usize {
        self.proceeded
    }
}
