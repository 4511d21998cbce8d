//! Drive a route handler through a few simulated requests.
//!
//! Demonstrates conditional replies, redirects and control signals.
//!
//! Run with: cargo run --example drive_handler

use route_harness::server::{InjectOptions, RouteOptions, Session};
use route_harness::{EntityOptions, Reply, Request, RequestOptions};
use std::collections::BTreeMap;

fn handler(req: &Request, reply: &mut Reply) -> route_harness::Result<()> {
    match req.path() {
        "/legacy" => {
            reply.redirect("/docs").permanent(true);
        }
        "/health" => {
            reply.proceed();
        }
        _ => {
            if reply.entity(EntityOptions::etag("docs-v3"))?.is_none() {
                reply.invoke("<h1>Docs</h1>").ttl(60_000).vary("accept-encoding");
            }
        }
    }
    Ok(())
}

fn request(path: &str, headers: &[(&str, &str)]) -> InjectOptions {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    InjectOptions::with_request(RequestOptions {
        path: Some(path.to_string()),
        headers: Some(headers),
        ..Default::default()
    })
}

fn main() -> route_harness::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Route Handler Harness Example");
    println!("=============================\n");

    let mut session = Session::new(RouteOptions::new("get", "/docs"), handler)?;

    let runs = [
        ("fresh fetch", request("/docs", &[])),
        ("stale validator", request("/docs", &[("if-none-match", "\"docs-v2\"")])),
        ("current validator", request("/docs", &[("if-none-match", "\"docs-v3\"")])),
        ("legacy path", request("/legacy", &[])),
        ("health check", request("/health", &[])),
    ];

    for (label, options) in runs {
        session.inject(options)??;

        println!("{}:", label);
        let printed = session.with_response(|response| {
            println!("  Status: {}", response.status_code());
            for (name, value) in response.headers() {
                println!("  {}: {}", name, value);
            }
        });
        if printed.is_none() {
            println!("  No response");
        }
        println!("  Continue: {}", session.has_control());
        println!("  Closed: {}\n", session.is_closed());
    }

    Ok(())
}
