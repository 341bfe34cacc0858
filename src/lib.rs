//! # weft
//!
//! A minimal HTTP framework whose handlers can be wrapped in aspect-oriented
//! advice: Before, After, Around, AfterReturning and AfterThrowing.
//!
//! ## The contract
//!
//! Handlers do application work. Everything that cuts across them (tracing
//! every call, observing every failure) is declared once as advice, bound
//! to handlers by pointcut expressions, and woven in at startup.
//!
//! - Routing: radix tree per method via [`matchit`]
//! - Serving: hyper, HTTP/1.1 and HTTP/2, graceful shutdown on SIGTERM / Ctrl-C
//! - Advice: [`middleware`], resolved once per call site, run synchronously
//!   on the calling thread
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use weft::middleware::{InterceptorRegistry, MethodSignature, TraceAspect, Weaver};
//! use weft::{IntoResponse, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), weft::Error> {
//!     let registry = InterceptorRegistry::builder()
//!         .aspect(TraceAspect::new("trace", "execution(* app.Greeter.*(..))", 1))
//!         .build()?;
//!     let weaver = Weaver::new(Arc::new(registry));
//!
//!     let greet = weaver.weave(
//!         MethodSignature::new("app.Greeter", "greet"),
//!         "Greeter",
//!         |_args| Ok(json!("hello")),
//!     );
//!
//!     let app = Router::new().get("/greet", move |_req: weft::Request| {
//!         let greet = greet.clone();
//!         async move { greet.invoke(Vec::new()).into_response() }
//!     });
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod middleware;

pub use error::{ConfigurationError, Error, Fault};
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
