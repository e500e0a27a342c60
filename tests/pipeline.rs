use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{
            ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH,
            CONTENT_TYPE, ORIGIN, WWW_AUTHENTICATE,
        },
        Method, Request, StatusCode,
    },
    response::Response,
    routing::get as get_route,
    Router,
};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use streetart::{
    api::{
        self,
        error::{Mode, GENERIC_ERROR_MESSAGE},
        middleware::HARDENED_HEADERS,
        AppContext,
    },
    auth::{Authenticator, Principal},
    directory::{
        bearer_verifier, password_verifier, BearerVerifier, DirectoryError, PasswordVerifier,
        UserDirectory,
    },
};
use tower::ServiceExt;
use uuid::Uuid;

const USER_ID: Uuid = Uuid::from_u128(0x0192_5a1e_7c3d_7000_8000_0000_0000_0042);
const EMAIL: &str = "banksy@example.com";
const PASSWORD: &str = "stencil";
const TOKEN: &str = "spray-can";
const BROKEN_EMAIL: &str = "broken@example.com";
const BROKEN_TOKEN: &str = "broken";

/// Single user; `broken@example.com` and the token `broken` simulate a
/// directory that cannot be queried.
struct MemoryDirectory;

impl UserDirectory for MemoryDirectory {
    fn authenticate_local(&self) -> PasswordVerifier {
        password_verifier(|_request, email, password| async move {
            if email == BROKEN_EMAIL {
                return Err(DirectoryError::Unavailable);
            }
            Ok((email == EMAIL && password.expose_secret() == PASSWORD)
                .then(|| Principal::new(USER_ID, email)))
        })
    }

    fn authenticate_bearer(&self) -> BearerVerifier {
        bearer_verifier(|token| async move {
            if token == BROKEN_TOKEN {
                return Err(DirectoryError::Unavailable);
            }
            Ok((token == TOKEN).then(|| Principal::new(USER_ID, EMAIL)))
        })
    }
}

fn app(mode: Mode) -> Router {
    api::app(&AppContext::new(mode, Authenticator::new(&MemoryDirectory)))
}

const MURAL_SIZE: usize = 4096;

async fn mural() -> String {
    "#".repeat(MURAL_SIZE)
}

async fn drip() -> &'static str {
    panic!("paint spilled on the handler")
}

/// The full pipeline around extra routes that the API itself does not expose.
fn gallery(mode: Mode) -> Router {
    api::pipeline(
        Router::new()
            .route("/mural", get_route(mural))
            .route("/drip", get_route(drip)),
        &AppContext::new(mode, Authenticator::new(&MemoryDirectory)),
    )
}

async fn send(mode: Mode, request: Request<Body>) -> Result<Response> {
    Ok(app(mode).oneshot(request).await?)
}

fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .uri(uri)
        .header(ORIGIN, "https://streetart.dev")
        .body(Body::empty())?)
}

fn post_json(uri: &str, body: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(ORIGIN, "https://streetart.dev")
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, body.len())
        .body(Body::from(body.to_string()))?)
}

async fn text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn root_welcomes() -> Result<()> {
    for _ in 0..2 {
        let response = send(Mode::Development, get("/")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await?, "Welcome to Street Art API.");
    }
    Ok(())
}

#[tokio::test]
async fn every_response_is_hardened() -> Result<()> {
    let response = send(Mode::Development, get("/")?).await?;
    for (name, value) in HARDENED_HEADERS {
        assert_eq!(response.headers()[name], value, "{name}");
    }
    assert!(response.headers().get("x-powered-by").is_none());
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "01J9ZQ6M3S8Y7V2K4T5R6P7Q8N")
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.headers()["x-request-id"], "01J9ZQ6M3S8Y7V2K4T5R6P7Q8N");
    Ok(())
}

#[tokio::test]
async fn unmatched_routes_are_not_found() -> Result<()> {
    for (method, uri) in [
        (Method::GET, "/murals"),
        (Method::DELETE, "/user"),
        (Method::GET, "/user/log_in"),
        (Method::POST, "/user/me"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(ORIGIN, "https://streetart.dev")
            .body(Body::empty())?;
        let response = send(Mode::Production, request).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(json_body(response).await?, json!({ "error": "Not Found" }));
    }
    Ok(())
}

#[tokio::test]
async fn preflight_lists_allowed_methods() -> Result<()> {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/user/me")
        .header(ORIGIN, "https://streetart.dev")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let methods = response.headers()[ACCESS_CONTROL_ALLOW_METHODS].to_str()?;
    for method in ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"] {
        assert!(methods.contains(method), "{methods}");
    }
    Ok(())
}

#[tokio::test]
async fn log_in_with_valid_credentials() -> Result<()> {
    let body = json!({ "email": EMAIL, "password": PASSWORD }).to_string();
    let response = send(Mode::Development, post_json("/user/log_in", &body)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(response).await?,
        json!({ "id": USER_ID, "email": EMAIL })
    );
    Ok(())
}

#[tokio::test]
async fn log_in_with_query_credentials() -> Result<()> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/user/log_in?email=banksy%40example.com&password=stencil")
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn log_in_with_wrong_password() -> Result<()> {
    let body = json!({ "email": EMAIL, "password": "roller" }).to_string();
    let response = send(Mode::Production, post_json("/user/log_in", &body)?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": "Invalid credentials" })
    );
    Ok(())
}

#[tokio::test]
async fn log_in_without_password() -> Result<()> {
    let body = json!({ "email": EMAIL }).to_string();
    let response = send(Mode::Development, post_json("/user/log_in", &body)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": "Missing credentials" })
    );
    Ok(())
}

#[tokio::test]
async fn me_with_valid_token() -> Result<()> {
    let request = Request::builder()
        .uri("/user/me")
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await?,
        json!({ "id": USER_ID, "email": EMAIL })
    );
    Ok(())
}

#[tokio::test]
async fn me_with_query_token() -> Result<()> {
    let response = send(
        Mode::Development,
        get(&format!("/user/me?access_token={TOKEN}"))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn me_with_unknown_token() -> Result<()> {
    let request = Request::builder()
        .uri("/user/me")
        .header(AUTHORIZATION, "Bearer wet-paint")
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[WWW_AUTHENTICATE],
        "Bearer realm=\"Users\", error=\"invalid_token\""
    );
    assert_eq!(json_body(response).await?, json!({ "error": "Invalid token" }));
    Ok(())
}

#[tokio::test]
async fn me_without_token() -> Result<()> {
    let response = send(Mode::Development, get("/user/me")?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer realm=\"Users\"");
    Ok(())
}

#[tokio::test]
async fn lookup_failure_is_redacted_in_production() -> Result<()> {
    let body = json!({ "email": BROKEN_EMAIL, "password": PASSWORD }).to_string();
    let response = send(Mode::Production, post_json("/user/log_in", &body)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(response).await?,
        json!({ "error": GENERIC_ERROR_MESSAGE })
    );
    Ok(())
}

#[tokio::test]
async fn lookup_failure_is_echoed_in_development() -> Result<()> {
    let request = Request::builder()
        .uri("/user/me")
        .header(AUTHORIZATION, format!("Bearer {BROKEN_TOKEN}"))
        .body(Body::empty())?;
    let response = send(Mode::Development, request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": DirectoryError::Unavailable.to_string() })
    );
    Ok(())
}

#[tokio::test]
async fn malformed_json_reaches_the_error_stage() -> Result<()> {
    let response = send(Mode::Development, post_json("/user/log_in", "{\"email\":")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let body = json_body(response).await?;
    assert!(body["error"]
        .as_str()
        .is_some_and(|error| error.starts_with("invalid JSON body")));

    let response = send(Mode::Production, post_json("/user/log_in", "\"banksy\"")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": GENERIC_ERROR_MESSAGE })
    );
    Ok(())
}

#[tokio::test]
async fn oversized_json_is_rejected() -> Result<()> {
    let ctx = AppContext::new(Mode::Development, Authenticator::new(&MemoryDirectory))
        .with_json_limit(16);
    let body = json!({ "email": EMAIL, "password": PASSWORD }).to_string();
    let response = api::app(&ctx)
        .oneshot(post_json("/user/log_in", &body)?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": "request entity too large" })
    );
    Ok(())
}

#[tokio::test]
async fn only_large_responses_are_gzipped() -> Result<()> {
    let gzip = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header(ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
    };

    let response = gallery(Mode::Development).oneshot(gzip("/mural")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let response = gallery(Mode::Development).oneshot(get("/mural")?).await?;
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(text(response).await?.len(), MURAL_SIZE);

    let response = send(Mode::Development, gzip("/")?).await?;
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(text(response).await?, "Welcome to Street Art API.");
    Ok(())
}

#[tokio::test]
async fn handler_panics_reach_the_error_stage() -> Result<()> {
    let response = gallery(Mode::Production).oneshot(get("/drip")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    assert_eq!(
        json_body(response).await?,
        json!({ "error": GENERIC_ERROR_MESSAGE })
    );

    let response = gallery(Mode::Development).oneshot(get("/drip")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await?,
        json!({ "error": "paint spilled on the handler" })
    );
    Ok(())
}

#[tokio::test]
async fn extra_routes_keep_the_not_found_fallback() -> Result<()> {
    let response = gallery(Mode::Production).oneshot(get("/user/me")?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(json_body(response).await?, json!({ "error": "Not Found" }));
    Ok(())
}
