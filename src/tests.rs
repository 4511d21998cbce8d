//! End-to-end harness tests: sessions driving handlers through the reply
//! protocol.

use crate::protocol::{set_header, HeaderMap, HeaderOptions};
use crate::server::{InjectOptions, RouteOptions, Session};
use crate::types::{RequestOptions, Source, Variety};
use crate::{EntityOptions, HarnessError, Reply, Request};
use bytes::Bytes;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Once;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}

fn route(method: &str, path: &str) -> RouteOptions {
    RouteOptions::new(method, path)
}

fn with_headers(headers: &[(&str, &str)]) -> InjectOptions {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    InjectOptions::with_request(RequestOptions {
        headers: Some(headers),
        ..Default::default()
    })
}

#[test]
fn test_reply_binding() {
    init_tracing();
    let mut session = Session::new(route("get", "/path"), |req: &Request, reply: &mut Reply| {
        let response = reply.invoke(42);
        assert_eq!(response.source().as_json(), Some(&json!(42)));
        assert_eq!(response.request().as_ref(), Some(req));
        req.clone()
    })
    .unwrap();

    let handler_request = session.inject(InjectOptions::default()).unwrap();

    let request = session.request().unwrap();
    assert_eq!(request, &handler_request);

    let (source, bound_to) = session
        .with_response(|res| (res.source().as_json().cloned(), res.request()))
        .unwrap();
    assert_eq!(source, Some(json!(42)));
    assert_eq!(bound_to.as_ref(), Some(&handler_request));
}

#[test]
fn test_request_mirrors_session_response() {
    let mut session = Session::new(route("get", "/path"), |_: &Request, reply: &mut Reply| {
        reply.invoke("hi").code(203);
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    let from_request = session
        .request()
        .unwrap()
        .with_response(|res| res.status_code());
    assert_eq!(from_request, Some(203));
    assert_eq!(session.with_response(|res| res.status_code()), Some(203));
}

#[test]
fn test_two_argument_reply() {
    let mut session = Session::new(route("get", "/path"), |_: &Request, reply: &mut Reply| {
        reply.invoke_with(false, 42);
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();
    let source = session.with_response(|res| res.source().as_json().cloned());
    assert_eq!(source, Some(Some(json!(42))));
}

#[test]
fn test_control_flag_reset() {
    let mut session = Session::new(route("get", "/path"), |req: &Request, reply: &mut Reply| {
        if req.header("x-close").is_some() {
            reply.close();
        }
    })
    .unwrap();

    session.inject(with_headers(&[("x-close", "1")])).unwrap();
    assert!(session.is_closed());

    session.inject(with_headers(&[])).unwrap();
    assert!(!session.is_closed());
    assert!(!session.has_control());
}

#[test]
fn test_continue_signal() {
    let mut session = Session::new(route("get", "/path"), |_: &Request, reply: &mut Reply| {
        reply.proceed();
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    assert!(session.has_control());
    assert!(!session.is_closed());
    assert!(!session.has_response());
}

#[test]
fn test_new_request_per_injection() {
    let mut session = Session::new(route("get", "/path"), |req: &Request, _: &mut Reply| {
        req.clone()
    })
    .unwrap();

    let first = session.inject(InjectOptions::default()).unwrap();
    let second = session.inject(InjectOptions::default()).unwrap();
    assert_ne!(first, second);
    assert_eq!(session.request(), Some(&second));
}

#[test]
fn test_last_call_wins() {
    let mut session = Session::new(route("get", "/path"), |_: &Request, reply: &mut Reply| {
        reply.invoke("first");
        reply.redirect("/elsewhere");
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    let redirect = session.with_response(|res| (res.is_redirect(), res.status_code()));
    assert_eq!(redirect, Some((true, 302)));
}

#[test]
fn test_conditional_short_circuit() {
    let mut session = Session::new(
        route("get", "/doc"),
        |_: &Request, reply: &mut Reply| -> crate::Result<bool> {
            let short_circuited = reply.entity(EntityOptions::etag("abc"))?.is_some();
            if !short_circuited {
                reply.invoke("fresh body");
            }
            Ok(short_circuited)
        },
    )
    .unwrap();

    let stale = session
        .inject(with_headers(&[("if-none-match", "\"xyz\"")]))
        .unwrap()
        .unwrap();
    assert!(stale);
    assert_eq!(session.with_response(|res| res.status_code()), Some(304));

    let fresh = session
        .inject(with_headers(&[("if-none-match", "\"abc\"")]))
        .unwrap()
        .unwrap();
    assert!(!fresh);
    let response = session.take_response().unwrap();
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.source().as_text(), Some("fresh body"));
}

#[test]
fn test_entity_without_validators_is_rejected() {
    let mut session = Session::new(route("get", "/doc"), |_: &Request, reply: &mut Reply| {
        reply.entity(EntityOptions::default()).map(|res| res.is_some())
    })
    .unwrap();

    let result = session.inject(InjectOptions::default()).unwrap();
    assert!(matches!(result, Err(HarnessError::InvalidOperation(_))));
}

#[test]
fn test_redirect_axis_sequence() {
    let mut session = Session::new(route("get", "/old"), |_: &Request, reply: &mut Reply| {
        let mut redirect = reply.redirect("/new");
        let mut codes = vec![redirect.status_code()];
        redirect.rewritable(false);
        codes.push(redirect.status_code());
        redirect.temporary(false);
        codes.push(redirect.status_code());
        redirect.rewritable(true);
        codes.push(redirect.status_code());
        codes
    })
    .unwrap();

    let codes = session.inject(InjectOptions::default()).unwrap();
    assert_eq!(codes, vec![302, 307, 308, 301]);

    let mut response = session.take_response().unwrap();
    let mut redirect = response.as_redirect().unwrap();
    redirect.permanent(false);
    assert_eq!(redirect.status_code(), 302);
}

#[test]
fn test_buffer_variety_overrides_inferred_type() {
    let mut session = Session::new(route("get", "/file"), |_: &Request, reply: &mut Reply| {
        reply.invoke(Bytes::from_static(b"\x89PNG"));
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    let response = session.take_response().unwrap();
    assert_eq!(response.variety(), Variety::Buffer);
    assert_eq!(
        response.header_str("content-type"),
        Some("application/octet-stream")
    );
}

#[test]
fn test_created_on_post_route() {
    let mut session = Session::new(route("post", "/items"), |_: &Request, reply: &mut Reply| {
        reply.invoke(json!({"id": 1})).created("/items/1").map(|res| res.status_code())
    })
    .unwrap();
    assert_eq!(session.inject(InjectOptions::default()).unwrap().unwrap(), 201);
}

#[test]
fn test_created_on_get_route_fails() {
    let mut session = Session::new(route("get", "/items"), |_: &Request, reply: &mut Reply| {
        reply.invoke(json!({"id": 1})).created("/items/1").map(|_| ())
    })
    .unwrap();
    let err = session.inject(InjectOptions::default()).unwrap().unwrap_err();
    assert!(err.is_invalid_operation());
}

#[test]
fn test_response_state_reaches_request_jar() {
    let mut session = Session::new(route("get", "/login"), |_: &Request, reply: &mut Reply| {
        reply.invoke(()).state("sid", "s-1", None).map(|_| ())
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap().unwrap();

    let entry = session.request().unwrap().state("sid").unwrap();
    assert_eq!(entry.value, Some(json!("s-1")));
}

#[test]
fn test_header_append_idempotence() {
    let options = HeaderOptions::append().without_duplicates();
    for (name, value) in [("x-tags", "a"), ("cache-control", "no-store"), ("vary", "origin")] {
        let mut once = HeaderMap::new();
        set_header(&mut once, name, "seed", &HeaderOptions::default()).unwrap();
        set_header(&mut once, name, value, &options).unwrap();

        let mut twice = once.clone();
        set_header(&mut twice, name, value, &options).unwrap();
        assert_eq!(once, twice, "{} not idempotent", name);
    }
}

#[test]
fn test_vary_absorption_through_reply() {
    let mut session = Session::new(route("get", "/path"), |_: &Request, reply: &mut Reply| {
        reply
            .invoke("body")
            .vary("accept")
            .header("Vary", "*")
            .vary("accept-encoding")
            .header("vary", "origin");
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();
    let vary = session.with_response(|res| res.header_str("vary").map(str::to_string));
    assert_eq!(vary, Some(Some("*".to_string())));
}

#[test]
fn test_session_from_json_options() -> anyhow::Result<()> {
    let options = RouteOptions::from_json(
        r#"{ "path": "/search", "method": "GET", "request": { "url": "/search?q=harness" } }"#,
    )?;
    let mut session = Session::new(options, |req: &Request, _: &mut Reply| {
        req.query().get("q").cloned()
    })?;

    assert_eq!(session.inject(InjectOptions::default())?.as_deref(), Some("harness"));
    Ok(())
}

#[test]
fn test_stream_reply() {
    let mut session = Session::new(route("get", "/events"), |_: &Request, reply: &mut Reply| {
        let chunks = vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))];
        reply.invoke(Source::stream(tokio_stream::iter(chunks)));
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    let response = session.take_response().unwrap();
    assert_eq!(response.variety(), Variety::Stream);
    assert!(response.header_value("content-type").is_none());

    let Source::Stream(stream) = response.into_source() else {
        panic!("expected a stream source");
    };
    let collected: Vec<Bytes> = tokio_test::block_on(async {
        use tokio_stream::StreamExt;
        stream.map(|chunk| chunk.unwrap()).collect().await
    });
    assert_eq!(collected, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
}

#[tokio::test]
async fn test_deferred_reply_is_left_to_driver() {
    init_tracing();
    let mut session = Session::new(route("get", "/slow"), |_: &Request, reply: &mut Reply| {
        reply.invoke(Source::deferred(async {
            tokio::task::yield_now().await;
            Source::from(json!({"done": true}))
        }));
    })
    .unwrap();
    session.inject(InjectOptions::default()).unwrap();

    let response = session.take_response().unwrap();
    assert_eq!(response.variety(), Variety::Promise);

    let Source::Deferred(deferred) = response.into_source() else {
        panic!("expected a deferred source");
    };
    let resolved = deferred.await;
    assert_eq!(resolved.as_json(), Some(&json!({"done": true})));
}
