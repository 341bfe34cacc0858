//! Middleware layer: advice woven around handler targets.
//!
//! Cross-cutting concerns (tracing, auditing, error observation) live here
//! instead of in the handlers. The moving parts:
//!
//! - [`PointcutRule`] picks call sites by declaring type, name, parameters and
//!   visibility.
//! - [`InterceptorRegistry`] holds [`AdviceBinding`]s, assembled at startup
//!   through [`RegistryBuilder`] and frozen afterwards.
//! - [`Weaver`] resolves the bindings for a call site once and returns an
//!   [`Advised`] target that runs the advice contract on every call.
//! - [`TraceAspect`] is the built-in join-point logger.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use weft::middleware::{InterceptorRegistry, MethodSignature, Weaver};
//!
//! let registry = InterceptorRegistry::builder()
//!     .after_returning("log", "execution(* app.Greeter.greet(..))", 1, |jp, value| {
//!         tracing::info!(method = jp.method_name(), %value, "returned");
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let greet = Weaver::new(Arc::new(registry)).weave(
//!     MethodSignature::new("app.Greeter", "greet").param("String"),
//!     "Greeter",
//!     |args| Ok(json!(format!("hello {}", args[0]))),
//! );
//! assert_eq!(greet.invoke(vec![json!("bob")]), Ok(json!("hello \"bob\"")));
//! ```

mod advice;
mod context;
mod invoke;
mod pointcut;
mod registry;
mod signature;
mod trace;

pub use advice::{Advice, AdviceBinding, AdviceKind};
pub use context::{InvocationContext, Phase, ProceedingJoinPoint};
pub use invoke::{Advised, Weaver};
pub use pointcut::PointcutRule;
pub use registry::{Aspect, InterceptorRegistry, RegistryBuilder};
pub use signature::{MethodSignature, Visibility};
pub use trace::TraceAspect;
