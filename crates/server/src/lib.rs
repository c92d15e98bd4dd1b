//! Custom variant provisioning API.
//!
//! One write endpoint (`POST /create-custom-variant`) that verifies the
//! caller-declared price, creates a variant on the parent product, and runs
//! the best-effort follow-ups (cleanup tagging, delivery-profile
//! assignment). Plus a liveness endpoint.
//!
//! The router is built here so integration tests can drive it in-process;
//! `main.rs` only wires configuration, observability, and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use axum::http::Request;
use state::AppState;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

/// Build the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
