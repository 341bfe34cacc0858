//! The send controller: one advised endpoint.
//!
//! ```text
//! GET /app/send            → 200 "我是返回值"
//! GET /app/send?index=<n>  → 500, the backing list is always empty
//! GET /app/send?index=x    → 400, `index` is not an integer
//! ```

use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::error::{ConfigurationError, Fault};
use crate::middleware::{Advised, InterceptorRegistry, MethodSignature, TraceAspect, Weaver};
use crate::request::Request;
use crate::response::{IntoResponse, Response, error_body};
use crate::router::Router;

pub const SEND_CONTROLLER: &str = "app.controller.SendController";
pub const SEND_POINTCUT: &str = "execution(public * app.controller.SendController.send*(..))";
pub const SEND_RESULT: &str = "我是返回值";

pub fn send_signature() -> MethodSignature {
    MethodSignature::new(SEND_CONTROLLER, "send").param("i64")
}

/// The controller method. Looks `index` up in an empty list when one is
/// given, so any non-null index fails.
pub fn send(args: &[Value]) -> Result<Value, Fault> {
    info!("send executing");
    let list: Vec<Value> = Vec::new();
    match args.first() {
        None | Some(Value::Null) => {}
        Some(raw) => {
            let index = raw
                .as_i64()
                .ok_or_else(|| Fault::Application(format!("index must be an integer, got {raw}")))?;
            usize::try_from(index)
                .ok()
                .and_then(|i| list.get(i))
                .ok_or(Fault::IndexOutOfRange { index, len: list.len() })?;
        }
    }
    Ok(Value::from(SEND_RESULT))
}

/// The registry the binary runs with: the trace aspect over every `send*`
/// method of the controller.
pub fn registry(settings: &Settings) -> Result<InterceptorRegistry, ConfigurationError> {
    InterceptorRegistry::builder()
        .aspect(TraceAspect::new("trace", SEND_POINTCUT, settings.trace_order))
        .build()
}

pub fn router(weaver: &Weaver) -> Router {
    let send = weaver.weave(send_signature(), "SendController", send);
    Router::new().get("/app/send", move |req: Request| {
        let send = send.clone();
        async move { send_endpoint(&send, &req) }
    })
}

/// Builds the whole application from settings.
pub fn build(settings: &Settings) -> Result<Router, ConfigurationError> {
    let registry = Arc::new(registry(settings)?);
    Ok(router(&Weaver::new(registry)))
}

#[derive(Deserialize)]
struct SendParams {
    index: Option<String>,
}

fn send_endpoint(send: &Advised, req: &Request) -> Response {
    let index = match index_param(req) {
        Ok(index) => index,
        Err(message) => return error_body(StatusCode::BAD_REQUEST, &message),
    };
    send.invoke(vec![index.map_or(Value::Null, Value::from)]).into_response()
}

/// An empty `index=` reads as absent.
fn index_param(req: &Request) -> Result<Option<i64>, String> {
    let params: SendParams = req.query().map_err(|e| e.to_string())?;
    match params.index.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("`index` must be an integer, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::Method;
    use serde_json::json;

    use super::*;
    use crate::middleware::RegistryBuilder;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Counts advice runs on the send pointcut.
    fn counting(log: &Log) -> RegistryBuilder {
        let (b, a, r, t) = (Arc::clone(log), Arc::clone(log), Arc::clone(log), Arc::clone(log));
        InterceptorRegistry::builder()
            .pointcut("sendMethods", SEND_POINTCUT)
            .before("before", "sendMethods()", 2, move |_| {
                b.lock().unwrap().push("before".into());
                Ok(())
            })
            .after("after", "execution(public * app.controller.SendController.send(..))", 2, move |_| {
                a.lock().unwrap().push("after".into());
                Ok(())
            })
            .after_returning("returning", "sendMethods()", 2, move |_, v| {
                r.lock().unwrap().push(format!("returning {v}"));
                Ok(())
            })
            .after_throwing("throwing", "sendMethods()", 2, move |_, e| {
                t.lock().unwrap().push(format!("throwing {e}"));
                Ok(())
            })
    }

    fn advised_send(builder: RegistryBuilder) -> Advised {
        let weaver = Weaver::new(Arc::new(builder.build().unwrap()));
        weaver.weave(send_signature(), "SendController", send)
    }

    fn get(uri: &str) -> Request {
        let (parts, ()) = http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        Request::new(parts, Bytes::new())
    }

    fn settings() -> Settings {
        Settings { bind: "127.0.0.1:0".into(), log: "info".into(), trace_order: 2 }
    }

    #[test]
    fn send_without_index_returns_the_fixed_value() {
        let log = Log::default();
        let send = advised_send(counting(&log));

        assert_eq!(send.invoke(vec![Value::Null]), Ok(json!(SEND_RESULT)));
        assert_eq!(*log.lock().unwrap(), ["before", "returning \"我是返回值\"", "after"]);
    }

    #[test]
    fn send_with_index_throws_and_after_still_runs() {
        let log = Log::default();
        let send = advised_send(counting(&log));

        let err = send.invoke(vec![json!(0)]).unwrap_err();
        assert_eq!(err, Fault::IndexOutOfRange { index: 0, len: 0 });
        assert_eq!(
            *log.lock().unwrap(),
            ["before", "throwing index 0 out of bounds for length 0", "after"],
        );
    }

    #[test]
    fn negative_index_is_out_of_range_too() {
        assert_eq!(send(&[json!(-1)]), Err(Fault::IndexOutOfRange { index: -1, len: 0 }));
    }

    #[test]
    fn non_integer_index_fails_instead_of_reading_as_absent() {
        assert_eq!(send(&[]), Ok(json!(SEND_RESULT)));
        assert_eq!(
            send(&[json!("3")]),
            Err(Fault::Application("index must be an integer, got \"3\"".into())),
        );
        assert!(send(&[json!(1.5)]).is_err());
        assert!(send(&[json!(u64::MAX)]).is_err());
    }

    #[test]
    fn around_rebinding_its_result_leaves_the_response_alone() {
        let log = Log::default();
        let seen = Arc::clone(&log);
        let builder = counting(&log).around("around", "sendMethods()", 2, move |pjp| {
            let mut proceed = pjp.proceed()?;
            seen.lock().unwrap().push(format!("around got {proceed}"));
            proceed = json!("在around可以修改返回值");
            seen.lock().unwrap().push(format!("around rebound to {proceed}"));
            Ok(())
        });
        let send = advised_send(builder);

        assert_eq!(send.invoke(vec![Value::Null]), Ok(json!(SEND_RESULT)));
        let entries = log.lock().unwrap();
        assert_eq!(entries.iter().filter(|e| e.starts_with("around got")).count(), 1);
        assert!(entries.contains(&"returning \"我是返回值\"".to_owned()));
    }

    #[test]
    fn trace_registry_covers_send() {
        let registry = registry(&settings()).unwrap();
        assert_eq!(registry.resolve(&send_signature()).len(), 5);
    }

    #[tokio::test]
    async fn http_send_without_index_is_200_text() {
        let router = build(&settings()).unwrap();
        let res = router.route(get("/app/send")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body(), SEND_RESULT.as_bytes());
    }

    #[tokio::test]
    async fn http_send_with_index_is_500() {
        let router = build(&settings()).unwrap();
        let res = router.route(get("/app/send?index=0")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], 500);
        assert_eq!(body["message"], "index 0 out of bounds for length 0");
    }

    #[tokio::test]
    async fn http_send_with_bad_index_is_400_and_skips_the_target() {
        let log = Log::default();
        let router = router(&Weaver::new(Arc::new(counting(&log).build().unwrap())));

        let res = router.route(get("/app/send?index=abc")).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(log.lock().unwrap().is_empty());

        let empty = router.route(get("/app/send?index=")).await;
        assert_eq!(empty.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn http_unknown_route_is_404() {
        let router = build(&settings()).unwrap();
        let res = router.route(get("/app/receive")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
