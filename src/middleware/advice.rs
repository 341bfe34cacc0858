//! Advice kinds, handlers and bindings.
//!
//! A handler's shape is fixed by what it needs to see:
//!
//! | Kind | Handler receives |
//! |---|---|
//! | `Before`, `After` | the join point |
//! | `AfterReturning` | the join point and a read-only return value |
//! | `AfterThrowing` | the join point and the error |
//! | `Around` | a [`ProceedingJoinPoint`] |
//!
//! A binding whose handler shape does not fit its declared kind is refused at
//! registration.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Fault;
use crate::middleware::context::{InvocationContext, ProceedingJoinPoint};
use crate::middleware::pointcut::PointcutRule;

/// When an advice runs relative to its join point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AdviceKind {
    Before,
    After,
    Around,
    AfterReturning,
    AfterThrowing,
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before         => "Before",
            Self::After          => "After",
            Self::Around         => "Around",
            Self::AfterReturning => "AfterReturning",
            Self::AfterThrowing  => "AfterThrowing",
        })
    }
}

type JoinPointFn = dyn Fn(&InvocationContext) -> Result<(), Fault> + Send + Sync;
type ReturningFn = dyn Fn(&InvocationContext, &Value) -> Result<(), Fault> + Send + Sync;
type ThrowingFn = dyn Fn(&InvocationContext, &Fault) -> Result<(), Fault> + Send + Sync;
type AroundFn = dyn Fn(&mut ProceedingJoinPoint<'_>) -> Result<(), Fault> + Send + Sync;

/// A type-erased advice handler.
#[derive(Clone)]
pub enum Advice {
    JoinPoint(Arc<JoinPointFn>),
    Returning(Arc<ReturningFn>),
    Throwing(Arc<ThrowingFn>),
    Around(Arc<AroundFn>),
}

impl Advice {
    pub fn join_point<F>(f: F) -> Self
    where
        F: Fn(&InvocationContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::JoinPoint(Arc::new(f))
    }

    pub fn returning<F>(f: F) -> Self
    where
        F: Fn(&InvocationContext, &Value) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::Returning(Arc::new(f))
    }

    pub fn throwing<F>(f: F) -> Self
    where
        F: Fn(&InvocationContext, &Fault) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::Throwing(Arc::new(f))
    }

    pub fn around<F>(f: F) -> Self
    where
        F: Fn(&mut ProceedingJoinPoint<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::Around(Arc::new(f))
    }

    pub(crate) fn fits(&self, kind: AdviceKind) -> bool {
        matches!(
            (self, kind),
            (Self::JoinPoint(_), AdviceKind::Before | AdviceKind::After)
                | (Self::Returning(_), AdviceKind::AfterReturning)
                | (Self::Throwing(_), AdviceKind::AfterThrowing)
                | (Self::Around(_), AdviceKind::Around)
        )
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Self::JoinPoint(_) => "a join point",
            Self::Returning(_) => "a join point and a return value",
            Self::Throwing(_)  => "a join point and an error",
            Self::Around(_)    => "a proceeding join point",
        }
    }
}

/// Pointcut → advice, with a priority. Lower priorities sit further out in
/// the onion: they enter first and leave last.
#[derive(Clone)]
pub struct AdviceBinding {
    name: Arc<str>,
    kind: AdviceKind,
    priority: i32,
    rule: PointcutRule,
    handler: Advice,
}

impl AdviceBinding {
    pub fn new(
        name: impl Into<String>,
        kind: AdviceKind,
        rule: PointcutRule,
        priority: i32,
        handler: Advice,
    ) -> Self {
        Self { name: name.into().into(), kind, priority, rule, handler }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> AdviceKind { self.kind }
    pub fn priority(&self) -> i32 { self.priority }
    pub fn rule(&self) -> &PointcutRule { &self.rule }
    pub fn handler(&self) -> &Advice { &self.handler }

    // The runners below rely on registration having checked `Advice::fits`.

    pub(crate) fn on_join_point(&self, ctx: &InvocationContext) -> Result<(), Fault> {
        match &self.handler {
            Advice::JoinPoint(f) => f(ctx),
            _ => Ok(()),
        }
    }

    pub(crate) fn on_returning(&self, ctx: &InvocationContext, value: &Value) -> Result<(), Fault> {
        match &self.handler {
            Advice::Returning(f) => f(ctx, value),
            _ => Ok(()),
        }
    }

    pub(crate) fn on_throwing(&self, ctx: &InvocationContext, fault: &Fault) -> Result<(), Fault> {
        match &self.handler {
            Advice::Throwing(f) => f(ctx, fault),
            _ => Ok(()),
        }
    }

    pub(crate) fn on_around(&self, pjp: &mut ProceedingJoinPoint<'_>) -> Result<(), Fault> {
        match &self.handler {
            Advice::Around(f) => f(pjp),
            _ => pjp.proceed().map(drop),
        }
    }
}

impl fmt::Debug for AdviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceBinding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("rule", &self.rule.expression())
            .finish_non_exhaustive()
    }
}
