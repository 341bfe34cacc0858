//! The interceptor registry and its startup builder.
//!
//! Registration is a startup activity. Once the registry is handed to a
//! [`Weaver`](crate::middleware::Weaver) it sits behind an `Arc` and is never
//! mutated again, so concurrent invocations read it without locking.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigurationError, Fault};
use crate::middleware::advice::{Advice, AdviceBinding, AdviceKind};
use crate::middleware::context::{InvocationContext, ProceedingJoinPoint};
use crate::middleware::pointcut::PointcutRule;
use crate::middleware::signature::MethodSignature;

/// Ordered advice bindings and named pointcuts.
#[derive(Debug, Default)]
pub struct InterceptorRegistry {
    bindings: Vec<AdviceBinding>,
    pointcuts: HashMap<String, PointcutRule>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { registry: Self::new(), error: None }
    }

    /// Compiles `expression` and makes it available as `name()` to every
    /// expression compiled after it.
    pub fn define_pointcut(&mut self, name: &str, expression: &str) -> Result<(), ConfigurationError> {
        if self.pointcuts.contains_key(name) {
            return Err(ConfigurationError::DuplicatePointcut(name.to_owned()));
        }
        let rule = self.compile(expression)?;
        self.pointcuts.insert(name.to_owned(), rule);
        Ok(())
    }

    /// Compiles `expression` against the named pointcuts defined so far.
    pub fn compile(&self, expression: &str) -> Result<PointcutRule, ConfigurationError> {
        PointcutRule::compile(expression, &self.pointcuts)
    }

    /// Appends a binding after checking its handler fits its kind.
    pub fn register(&mut self, binding: AdviceBinding) -> Result<(), ConfigurationError> {
        if !binding.handler().fits(binding.kind()) {
            return Err(ConfigurationError::HandlerMismatch {
                binding: binding.name().to_owned(),
                declared: binding.kind(),
                handler: binding.handler().shape(),
            });
        }
        if self.bindings.iter().any(|b| b.name() == binding.name()) {
            return Err(ConfigurationError::DuplicateBinding(binding.name().to_owned()));
        }
        debug!(
            binding = binding.name(),
            kind = %binding.kind(),
            priority = binding.priority(),
            pointcut = binding.rule().expression(),
            "advice registered",
        );
        self.bindings.push(binding);
        Ok(())
    }

    /// Bindings whose pointcut matches `signature`, ascending by priority.
    /// Equal priorities keep registration order.
    pub fn resolve(&self, signature: &MethodSignature) -> Vec<AdviceBinding> {
        let mut matched: Vec<AdviceBinding> = self.bindings
            .iter()
            .filter(|b| b.rule().matches(signature))
            .cloned()
            .collect();
        matched.sort_by_key(AdviceBinding::priority);
        matched
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A unit of related advice that installs itself in one go.
pub trait Aspect {
    fn configure(self, builder: RegistryBuilder) -> RegistryBuilder;
}

/// Chained registry assembly. The first failure is kept; later calls become
/// no-ops and [`build`](Self::build) reports it.
///
/// ```rust
/// use weft::middleware::InterceptorRegistry;
///
/// let registry = InterceptorRegistry::builder()
///     .pointcut("sendMethods", "execution(* app.controller.SendController.send*(..))")
///     .before("audit", "sendMethods()", 1, |jp| {
///         tracing::info!(method = jp.method_name(), "audit");
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
pub struct RegistryBuilder {
    registry: InterceptorRegistry,
    error: Option<ConfigurationError>,
}

impl RegistryBuilder {
    fn apply(mut self, step: impl FnOnce(&mut InterceptorRegistry) -> Result<(), ConfigurationError>) -> Self {
        if self.error.is_none() {
            if let Err(e) = step(&mut self.registry) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn pointcut(self, name: &str, expression: &str) -> Self {
        self.apply(|r| r.define_pointcut(name, expression))
    }

    /// Registers a prebuilt binding.
    pub fn binding(self, binding: AdviceBinding) -> Self {
        self.apply(|r| r.register(binding))
    }

    /// Compiles `pointcut` and registers `handler` under `name`.
    pub fn advice(self, name: &str, kind: AdviceKind, pointcut: &str, priority: i32, handler: Advice) -> Self {
        self.apply(|r| {
            let rule = r.compile(pointcut)?;
            r.register(AdviceBinding::new(name, kind, rule, priority, handler))
        })
    }

    pub fn before<F>(self, name: &str, pointcut: &str, priority: i32, f: F) -> Self
    where
        F: Fn(&InvocationContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.advice(name, AdviceKind::Before, pointcut, priority, Advice::join_point(f))
    }

    pub fn after<F>(self, name: &str, pointcut: &str, priority: i32, f: F) -> Self
    where
        F: Fn(&InvocationContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.advice(name, AdviceKind::After, pointcut, priority, Advice::join_point(f))
    }

    pub fn around<F>(self, name: &str, pointcut: &str, priority: i32, f: F) -> Self
    where
        F: Fn(&mut ProceedingJoinPoint<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.advice(name, AdviceKind::Around, pointcut, priority, Advice::around(f))
    }

    pub fn after_returning<F>(self, name: &str, pointcut: &str, priority: i32, f: F) -> Self
    where
        F: Fn(&InvocationContext, &Value) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.advice(name, AdviceKind::AfterReturning, pointcut, priority, Advice::returning(f))
    }

    pub fn after_throwing<F>(self, name: &str, pointcut: &str, priority: i32, f: F) -> Self
    where
        F: Fn(&InvocationContext, &Fault) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.advice(name, AdviceKind::AfterThrowing, pointcut, priority, Advice::throwing(f))
    }

    pub fn aspect(self, aspect: impl Aspect) -> Self {
        aspect.configure(self)
    }

    pub fn build(self) -> Result<InterceptorRegistry, ConfigurationError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &InvocationContext) -> Result<(), Fault> {
        Ok(())
    }

    fn send() -> MethodSignature {
        MethodSignature::new("app.controller.SendController", "send").param("i64")
    }

    #[test]
    fn resolve_filters_and_sorts_by_priority() {
        let registry = InterceptorRegistry::builder()
            .before("late", "execution(* *.send(..))", 10, noop)
            .before("elsewhere", "execution(* *.receive(..))", 0, noop)
            .after("early", "within(app..*)", -5, noop)
            .before("tie", "execution(* *.send(..))", 10, noop)
            .build()
            .unwrap();

        let names: Vec<_> = registry.resolve(&send()).iter().map(|b| b.name().to_owned()).collect();
        assert_eq!(names, ["early", "late", "tie"]);
    }

    #[test]
    fn mismatched_handler_is_refused() {
        let mut registry = InterceptorRegistry::new();
        let rule = registry.compile("within(app..*)").unwrap();
        let err = registry
            .register(AdviceBinding::new("oops", AdviceKind::AfterThrowing, rule, 0, Advice::join_point(noop)))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigurationError::HandlerMismatch { declared: AdviceKind::AfterThrowing, .. }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn join_point_handler_fits_before_and_after_only() {
        let handler = Advice::join_point(noop);
        assert!(handler.fits(AdviceKind::Before));
        assert!(handler.fits(AdviceKind::After));
        assert!(!handler.fits(AdviceKind::Around));
        assert!(!handler.fits(AdviceKind::AfterReturning));
        assert!(Advice::around(|pjp| pjp.proceed().map(drop)).fits(AdviceKind::Around));
    }

    #[test]
    fn duplicate_names_are_refused() {
        let err = InterceptorRegistry::builder()
            .pointcut("p", "within(app..*)")
            .pointcut("p", "within(lib..*)")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicatePointcut(ref n) if n == "p"));

        let err = InterceptorRegistry::builder()
            .before("b", "within(app..*)", 0, noop)
            .after("b", "within(app..*)", 0, noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateBinding(ref n) if n == "b"));
    }

    #[test]
    fn builder_keeps_the_first_error() {
        let err = InterceptorRegistry::builder()
            .before("a", "nope()", 0, noop)
            .before("b", "execution(", 0, noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownPointcut(ref n) if n == "nope"));
    }

    #[test]
    fn aspects_install_through_the_builder() {
        struct Audit;

        impl Aspect for Audit {
            fn configure(self, builder: RegistryBuilder) -> RegistryBuilder {
                builder
                    .pointcut("audited", "within(app..*)")
                    .before("audit.before", "audited()", 1, noop)
                    .after("audit.after", "audited()", 1, noop)
            }
        }

        let registry = InterceptorRegistry::builder().aspect(Audit).build().unwrap();
        assert_eq!(registry.resolve(&send()).len(), 2);
    }
}
