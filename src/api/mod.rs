use crate::auth::Authenticator;
use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Extension, Router,
};
use error::Mode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::{
        predicate::{NotForContentType, Predicate, SizeAbove},
        CompressionLayer,
    },
    cors::{AllowHeaders, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

pub mod error;
pub(crate) mod handlers;
pub mod middleware;
mod openapi;

pub use openapi::openapi;

/// Responses smaller than this are sent uncompressed.
pub const COMPRESSION_THRESHOLD: u16 = 1024;

/// Everything the pipeline needs, built once at startup.
#[derive(Clone, Debug)]
pub struct AppContext {
    pub mode: Mode,
    pub authenticator: Arc<Authenticator>,
    pub json_limit: usize,
}

impl AppContext {
    #[must_use]
    pub fn new(mode: Mode, authenticator: Authenticator) -> Self {
        Self {
            mode,
            authenticator: Arc::new(authenticator),
            json_limit: self::middleware::DEFAULT_JSON_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_json_limit(mut self, json_limit: usize) -> Self {
        self.json_limit = json_limit;
        self
    }
}

/// The API routes wrapped in the request pipeline.
pub fn app(ctx: &AppContext) -> Router {
    pipeline(
        Router::new()
            .route("/", get(handlers::root::root))
            .nest("/user", handlers::user::router()),
        ctx,
    )
}

/// Wrap `routes` in the request pipeline, adding the 404 fallback.
///
/// Outermost first: request id and tracing, security headers, compression,
/// CORS, the terminal error stage, panic capture, JSON body parsing, the
/// authenticator, then `routes` with the 404 fallback.
pub fn pipeline(routes: Router, ctx: &AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request());

    let compression = CompressionLayer::new().compress_when(
        SizeAbove::new(COMPRESSION_THRESHOLD)
            .and(NotForContentType::GRPC)
            .and(NotForContentType::IMAGES)
            .and(NotForContentType::SSE),
    );

    routes
        .fallback(handlers::not_found::not_found)
        .layer(Extension(ctx.authenticator.clone()))
        .layer(from_fn_with_state(
            ctx.json_limit,
            self::middleware::parse_json_body,
        ))
        .layer(CatchPanicLayer::custom(self::middleware::panic_to_error))
        .layer(from_fn_with_state(
            ctx.mode,
            self::middleware::forward_errors,
        ))
        .layer(cors)
        .layer(compression)
        .layer(from_fn(self::middleware::security_headers))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Serve the pipeline on `[::]:port` until ctrl-c.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails
pub async fn new(port: u16, ctx: AppContext) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!(mode = %ctx.mode, "Street Art API running on port {port}");

    axum::serve(listener, app(&ctx).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let method = request.method();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
