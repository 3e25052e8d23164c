//! Edge authorization gate: pre-render routing decisions for a browser
//! frontend, driven by session-cookie presence and a remote role check.
//!
//! The gate is a convenience layer and is spoofable by construction (it only
//! sees whether a session cookie exists, not whether it is valid). The auth
//! handlers remain the trust boundary; the gate must never be the sole
//! enforcement point for a protected operation.

pub mod probe;

pub use probe::{HttpRoleProbe, RoleProbe};

use tracing::warn;

/// Path classes evaluated by the gate, matched by prefix.
#[derive(Debug, Clone)]
pub struct RouteRules {
    public: Vec<String>,
    user: Vec<String>,
    admin: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            public: vec!["/login".to_string(), "/register".to_string()],
            user: vec!["/profile".to_string(), "/user".to_string()],
            admin: vec!["/admin".to_string()],
        }
    }
}

impl RouteRules {
    #[must_use]
    pub fn new(public: Vec<String>, user: Vec<String>, admin: Vec<String>) -> Self {
        Self {
            public,
            user,
            admin,
        }
    }

    fn is_public_only(&self, path: &str) -> bool {
        matches_prefix(&self.public, path)
    }

    fn is_admin(&self, path: &str) -> bool {
        matches_prefix(&self.admin, path)
    }

    fn is_protected(&self, path: &str) -> bool {
        matches_prefix(&self.user, path) || self.is_admin(path)
    }
}

fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| {
        path == prefix
            || path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Outcome of evaluating a navigation against the gate rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectHome,
    RedirectLogin { redirect: String },
}

impl GateDecision {
    fn login(path: &str) -> Self {
        Self::RedirectLogin {
            redirect: path.to_string(),
        }
    }
}

/// Evaluate a navigation. Rules apply in order: authenticated callers are
/// bounced off public-only paths, unauthenticated callers are bounced off
/// protected paths, and admin paths require a live role check. A failed or
/// unreachable role check fails closed to the login redirect.
pub async fn evaluate(
    rules: &RouteRules,
    probe: &dyn RoleProbe,
    path: &str,
    has_session_cookie: bool,
) -> GateDecision {
    if has_session_cookie && rules.is_public_only(path) {
        return GateDecision::RedirectHome;
    }

    if !has_session_cookie && rules.is_protected(path) {
        return GateDecision::login(path);
    }

    if has_session_cookie && rules.is_admin(path) {
        return match probe.roles().await {
            Ok(roles) => {
                if roles.iter().any(|role| role.eq_ignore_ascii_case("admin")) {
                    GateDecision::Allow
                } else {
                    GateDecision::RedirectHome
                }
            }
            Err(error) => {
                warn!("Role check failed, redirecting to login: {}", error);
                GateDecision::login(path)
            }
        };
    }

    GateDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::probe::{ProbeError, RoleProbe};
    use super::{GateDecision, RouteRules, evaluate};
    use async_trait::async_trait;

    struct FixedProbe(Result<Vec<String>, ()>);

    #[async_trait]
    impl RoleProbe for FixedProbe {
        async fn roles(&self) -> Result<Vec<String>, ProbeError> {
            self.0
                .clone()
                .map_err(|()| ProbeError::Status(reqwest::StatusCode::UNAUTHORIZED))
        }
    }

    fn admin_probe() -> FixedProbe {
        FixedProbe(Ok(vec!["Admin".to_string(), "User".to_string()]))
    }

    #[tokio::test]
    async fn anonymous_admin_navigation_redirects_to_login_with_return_target() {
        let decision = evaluate(&RouteRules::default(), &admin_probe(), "/admin", false).await;
        assert_eq!(
            decision,
            GateDecision::RedirectLogin {
                redirect: "/admin".to_string()
            }
        );
    }

    #[tokio::test]
    async fn authenticated_login_navigation_redirects_home() {
        let decision = evaluate(&RouteRules::default(), &admin_probe(), "/login", true).await;
        assert_eq!(decision, GateDecision::RedirectHome);
    }

    #[tokio::test]
    async fn admin_path_without_admin_role_redirects_home() {
        let probe = FixedProbe(Ok(vec!["User".to_string()]));
        let decision = evaluate(&RouteRules::default(), &probe, "/admin", true).await;
        assert_eq!(decision, GateDecision::RedirectHome);
    }

    #[tokio::test]
    async fn admin_role_check_is_case_insensitive() {
        let probe = FixedProbe(Ok(vec!["ADMIN".to_string()]));
        let decision = evaluate(&RouteRules::default(), &probe, "/admin/users", true).await;
        assert_eq!(decision, GateDecision::Allow);
    }

    #[tokio::test]
    async fn failed_role_check_fails_closed_to_login() {
        let probe = FixedProbe(Err(()));
        let decision = evaluate(&RouteRules::default(), &probe, "/admin", true).await;
        assert_eq!(
            decision,
            GateDecision::RedirectLogin {
                redirect: "/admin".to_string()
            }
        );
    }

    #[tokio::test]
    async fn anonymous_user_path_redirects_to_login() {
        let decision = evaluate(
            &RouteRules::default(),
            &admin_probe(),
            "/profile/settings",
            false,
        )
        .await;
        assert_eq!(
            decision,
            GateDecision::RedirectLogin {
                redirect: "/profile/settings".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unlisted_paths_are_allowed_either_way() {
        let rules = RouteRules::default();
        for authenticated in [true, false] {
            let decision = evaluate(&rules, &admin_probe(), "/about", authenticated).await;
            assert_eq!(decision, GateDecision::Allow);
        }
    }

    #[tokio::test]
    async fn prefix_matching_requires_a_segment_boundary() {
        // "/administrator" is not under "/admin".
        let decision = evaluate(
            &RouteRules::default(),
            &admin_probe(),
            "/administrator",
            false,
        )
        .await;
        assert_eq!(decision, GateDecision::Allow);
    }
}
