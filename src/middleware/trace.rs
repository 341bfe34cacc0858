//! Built-in tracing aspect.
//!
//! Logs every phase of a matched join point through `tracing`: who was
//! called, with what, on which object, and how it ended.
//!
//! ```rust
//! use weft::middleware::{InterceptorRegistry, TraceAspect};
//!
//! let registry = InterceptorRegistry::builder()
//!     .aspect(TraceAspect::new("trace", "execution(* app..send*(..))", 2))
//!     .build()
//!     .unwrap();
//! assert_eq!(registry.len(), 5);
//! ```

use tracing::info;

use crate::middleware::context::InvocationContext;
use crate::middleware::registry::{Aspect, RegistryBuilder};

/// Before, After, Around, AfterReturning and AfterThrowing advice that log
/// the join point.
///
/// All five bindings share the aspect's `order` as their priority. The
/// aspect's `name` is its named pointcut and the prefix of its binding names,
/// so it must be unique within a registry.
pub struct TraceAspect {
    name: String,
    pointcut: String,
    order: i32,
}

impl TraceAspect {
    pub fn new(name: impl Into<String>, pointcut: impl Into<String>, order: i32) -> Self {
        Self { name: name.into(), pointcut: pointcut.into(), order }
    }
}

impl Aspect for TraceAspect {
    fn configure(self, builder: RegistryBuilder) -> RegistryBuilder {
        let name = self.name.as_str();
        let reference = format!("{name}()");
        let binding = |kind: &str| format!("{name}.{kind}");
        builder
            .pointcut(name, &self.pointcut)
            .before(&binding("before"), &reference, self.order, |jp| {
                info!("entering before advice");
                log_join_point(jp);
                Ok(())
            })
            .after(&binding("after"), &reference, self.order, |jp| {
                info!("entering after advice");
                log_join_point(jp);
                Ok(())
            })
            .around(&binding("around"), &reference, self.order, |pjp| {
                info!("entering around advice");
                let result = pjp.proceed()?;
                info!(%result, "target returned");
                Ok(())
            })
            .after_returning(&binding("after_returning"), &reference, self.order, |jp, result| {
                info!(%result, "entering after-returning advice");
                log_join_point(jp);
                Ok(())
            })
            .after_throwing(&binding("after_throwing"), &reference, self.order, |jp, error| {
                info!("entering after-throwing advice");
                log_join_point(jp);
                info!(%error, "caught error");
                Ok(())
            })
    }
}

fn log_join_point(jp: &InvocationContext) {
    let sig = jp.signature();
    info!(
        method = sig.name(),
        simple_type = sig.simple_type_name(),
        declaring_type = sig.declaring_type(),
        modifiers = %sig.modifiers(),
        "join point",
    );
    for (i, arg) in jp.args().iter().enumerate() {
        info!(position = i + 1, %arg, "argument");
    }
    info!(target_object = jp.target(), proxy = jp.this(), "advised object");
}
