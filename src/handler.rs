//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router keeps handlers of *different* types in one `matchit` tree per
//! method. A tree holds one concrete value type, so every handler is hidden
//! behind `dyn ErasedHandler` and stored uniformly.
//!
//! ```text
//! move |req: Request| { … send.invoke(args) … }    ← closure over an Advised
//!        ↓ router.get("/app/send", handler)
//! handler.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(handler))                      ← BoxedHandler
//!        ↓
//! handler.call(req) at request time                 ← one vtable dispatch
//!        ↓
//! Box::pin(async { handler(req).await.into_response() })
//! ```
//!
//! Per request that is one `Arc` clone and one virtual call. The advice chain
//! inside the handler was resolved when the route was built.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A boxed future resolving to a [`Response`].
///
/// `Send + 'static` so tokio can move it to any worker thread.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)`: it appears in the return
/// type of the public `Handler::into_boxed_handler`.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every connection task.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler: any
/// `Fn(Request) -> impl Future<Output = impl IntoResponse>`.
///
/// Closures need their argument annotated (`|req: Request|`); inference does
/// not reach through the blanket impl.
///
/// Sealed. Only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// `Sealed` is unnameable outside this crate, so nothing else can implement
/// `Handler`.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // Any advised call inside the handler runs when this future is polled.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
