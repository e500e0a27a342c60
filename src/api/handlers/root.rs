pub const WELCOME_MESSAGE: &str = "Welcome to Street Art API.";

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome message", body = String, content_type = "text/plain")
    ),
    tag = "streetart"
)]
// axum handler for the API root
pub async fn root() -> &'static str {
    WELCOME_MESSAGE
}
