use super::handlers::{auth, health};
use utoipa::OpenApi;
use utoipa::openapi::{InfoBuilder, License, Tag};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::session::login,
        auth::session::refresh,
        auth::session::logout,
        auth::session::me,
        auth::session::check_auth,
    ),
    components(schemas(
        health::Health,
        auth::types::LoginRequest,
        auth::types::UserResponse,
        auth::types::CheckAuthResponse,
        auth::types::MessageResponse,
    ))
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the derive defaults.
    spec.info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    spec.info.license = Some(License::new(env!("CARGO_PKG_LICENSE")));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, refresh, logout and session introspection".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and database health".to_string());

    spec.tags = Some(vec![auth_tag, health_tag]);
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );
    }

    #[test]
    fn openapi_covers_every_session_endpoint() {
        let spec = openapi();
        for path in [
            "/health",
            "/auth/login",
            "/auth/refresh",
            "/auth/logout",
            "/auth/me",
            "/auth/check-auth",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
