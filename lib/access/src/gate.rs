//! Request-time role gate.
//!
//! Paths are classified by an ordered rule table compiled once at startup.
//! The first matching rule wins; paths matching no rule get the configured
//! fallback. Identity is only resolved when the winning rule requires it, so
//! public and unlisted paths never cost a call to the identity provider.

use serde::Deserialize;
use url::form_urlencoded;

use crate::authenticator::Authenticator;
use crate::identity::{AuthenticatedUser, SessionToken};
use crate::role::Role;

/// How a path is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// The path equals the pattern.
    Exact(&'static str),
    /// The path starts with the pattern, with no segment boundary check.
    Prefix(&'static str),
    /// The path equals the pattern or lies under it (`/a` matches `/a/b`
    /// but not `/ab`).
    Subtree(&'static str),
}

impl PathPattern {
    /// Returns true if `path` matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == *p,
            Self::Prefix(p) => path.starts_with(p),
            Self::Subtree(p) => path
                .strip_prefix(p)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

/// What a path requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No identity check at all.
    Public,
    /// Any resolvable identity.
    Authenticated,
    /// A resolvable identity holding this role.
    Role(Role),
}

/// What happens to paths that match no rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlistedPaths {
    /// Let them through without an identity check.
    #[default]
    Allow,
    /// Require a resolvable identity of any role.
    Authenticated,
}

impl UnlistedPaths {
    const fn access(self) -> Access {
        match self {
            Self::Allow => Access::Public,
            Self::Authenticated => Access::Authenticated,
        }
    }
}

/// A single `(pattern, access)` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: PathPattern,
    pub access: Access,
}

impl Rule {
    const fn new(pattern: PathPattern, access: Access) -> Self {
        Self { pattern, access }
    }
}

const STANDARD_RULES: &[Rule] = &[
    // Pages anyone can see.
    Rule::new(PathPattern::Exact("/"), Access::Public),
    Rule::new(PathPattern::Prefix("/login"), Access::Public),
    Rule::new(PathPattern::Prefix("/termos"), Access::Public),
    Rule::new(PathPattern::Prefix("/privacidade"), Access::Public),
    Rule::new(PathPattern::Prefix("/p/"), Access::Public),
    Rule::new(PathPattern::Prefix("/auth/callback"), Access::Public),
    // Static assets.
    Rule::new(PathPattern::Prefix("/_next"), Access::Public),
    Rule::new(PathPattern::Prefix("/favicon"), Access::Public),
    Rule::new(PathPattern::Prefix("/images"), Access::Public),
    Rule::new(PathPattern::Prefix("/icons"), Access::Public),
    Rule::new(PathPattern::Prefix("/public"), Access::Public),
    // Endpoints this service answers without a session.
    Rule::new(PathPattern::Exact("/healthz"), Access::Public),
    Rule::new(PathPattern::Subtree("/api/webhooks"), Access::Public),
    Rule::new(PathPattern::Subtree("/api/public"), Access::Public),
    Rule::new(PathPattern::Exact("/auth/logout"), Access::Public),
    // Role areas.
    Rule::new(PathPattern::Subtree("/dashboard"), Access::Role(Role::Aluno)),
    Rule::new(PathPattern::Subtree("/aluno"), Access::Role(Role::Aluno)),
    Rule::new(
        PathPattern::Subtree("/professor"),
        Access::Role(Role::Professor),
    ),
];

/// The compiled, ordered rule table.
#[derive(Debug, Clone)]
pub struct GateRules {
    rules: Vec<Rule>,
    fallback: Access,
}

impl GateRules {
    /// Builds a table from explicit rules.
    #[must_use]
    pub fn new(rules: Vec<Rule>, unlisted: UnlistedPaths) -> Self {
        Self {
            rules,
            fallback: unlisted.access(),
        }
    }

    /// The application's route table.
    #[must_use]
    pub fn standard(unlisted: UnlistedPaths) -> Self {
        Self::new(STANDARD_RULES.to_vec(), unlisted)
    }

    /// Returns the access required for `path`.
    #[must_use]
    pub fn classify(&self, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map_or(self.fallback, |rule| rule.access)
    }
}

/// The gate's verdict for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through. Carries the user when one was resolved.
    Proceed { user: Option<AuthenticatedUser> },
    /// Send the caller to log in, then back to `next`.
    RedirectToLogin { next: String },
    /// Send the caller to the landing page of the role they hold.
    RedirectHome { role: Role },
}

impl GateDecision {
    /// Returns the redirect target, or `None` when proceeding.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Proceed { .. } => None,
            Self::RedirectToLogin { next } => {
                let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
                Some(format!("/login?next={encoded}"))
            }
            Self::RedirectHome { role } => Some(role.home_path().to_string()),
        }
    }
}

/// The role gate.
#[derive(Clone)]
pub struct RoleGate {
    rules: GateRules,
    authenticator: Authenticator,
}

impl RoleGate {
    /// Creates a gate over a compiled rule table.
    #[must_use]
    pub fn new(rules: GateRules, authenticator: Authenticator) -> Self {
        Self {
            rules,
            authenticator,
        }
    }

    /// Classifies `path` without resolving any identity.
    #[must_use]
    pub fn classify(&self, path: &str) -> Access {
        self.rules.classify(path)
    }

    /// Decides what to do with a request for `path` (plus optional `query`)
    /// made with `token`.
    pub async fn evaluate(
        &self,
        path: &str,
        query: Option<&str>,
        token: Option<&SessionToken>,
    ) -> GateDecision {
        let required = self.classify(path);
        if required == Access::Public {
            return GateDecision::Proceed { user: None };
        }

        let user = match self.authenticator.authenticate(token).await {
            Ok(user) => user,
            Err(failure) => {
                tracing::debug!(path, %failure, "Redirecting to login");
                let next = match query {
                    Some(q) if !q.is_empty() => format!("{path}?{q}"),
                    _ => path.to_string(),
                };
                return GateDecision::RedirectToLogin { next };
            }
        };

        match required {
            Access::Role(role) if role != user.role => {
                tracing::debug!(
                    path,
                    required = %role,
                    actual = %user.role,
                    "Role mismatch, redirecting home"
                );
                GateDecision::RedirectHome { role: user.role }
            }
            _ => GateDecision::Proceed { user: Some(user) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::memory::{InMemoryProfileStore, InMemorySessionResolver, StoredProfile};
    use coachdesk_core::SubjectId;
    use std::sync::Arc;

    const PUBLIC_PATHS: &[&str] = &[
        "/",
        "/login",
        "/login/reset",
        "/termos",
        "/privacidade",
        "/p/ana-silva",
        "/auth/callback",
        "/_next/static/chunk.js",
        "/favicon.ico",
        "/images/hero.png",
        "/icons/logo.svg",
        "/public/manifest.json",
        "/api/webhooks/stripe",
        "/api/public/professores/ana",
        "/healthz",
    ];

    async fn gate(unlisted: UnlistedPaths) -> RoleGate {
        let resolver = Arc::new(InMemorySessionResolver::new());
        resolver
            .insert("aluno", Identity::new(SubjectId::new("a1"), None))
            .await;
        resolver
            .insert("prof", Identity::new(SubjectId::new("p1"), None))
            .await;
        resolver
            .insert("no-profile", Identity::new(SubjectId::new("x"), None))
            .await;

        let profiles = Arc::new(InMemoryProfileStore::new());
        profiles
            .insert(SubjectId::new("a1"), StoredProfile::aluno("Bia", "p1"))
            .await;
        profiles
            .insert(SubjectId::new("p1"), StoredProfile::professor("Ana", "ana"))
            .await;

        RoleGate::new(
            GateRules::standard(unlisted),
            Authenticator::new(resolver, profiles),
        )
    }

    fn token(raw: &str) -> SessionToken {
        SessionToken::new(raw).expect("token")
    }

    #[test]
    fn subtree_respects_segment_boundaries() {
        let pattern = PathPattern::Subtree("/aluno");
        assert!(pattern.matches("/aluno"));
        assert!(pattern.matches("/aluno/treinos"));
        assert!(!pattern.matches("/alunos"));
    }

    #[test]
    fn classification_follows_rule_order() {
        let rules = GateRules::standard(UnlistedPaths::Allow);
        assert_eq!(rules.classify("/dashboard"), Access::Role(Role::Aluno));
        assert_eq!(rules.classify("/aluno/fotos"), Access::Role(Role::Aluno));
        assert_eq!(
            rules.classify("/professor/alunos"),
            Access::Role(Role::Professor)
        );
        assert_eq!(rules.classify("/comunidade"), Access::Public);
    }

    #[test]
    fn deny_by_default_requires_authentication_for_unlisted_paths() {
        let rules = GateRules::standard(UnlistedPaths::Authenticated);
        assert_eq!(rules.classify("/comunidade"), Access::Authenticated);
        assert_eq!(rules.classify("/login"), Access::Public);
    }

    #[tokio::test]
    async fn public_paths_proceed_regardless_of_session() {
        let gate = gate(UnlistedPaths::Allow).await;
        let bogus = token("bogus");
        for path in PUBLIC_PATHS {
            for tok in [None, Some(&bogus)] {
                assert_eq!(
                    gate.evaluate(path, None, tok).await,
                    GateDecision::Proceed { user: None },
                    "{path} should be public"
                );
            }
        }
    }

    #[tokio::test]
    async fn aluno_area_without_session_redirects_to_login_with_next() {
        let gate = gate(UnlistedPaths::Allow).await;
        for path in ["/dashboard", "/aluno/treinos"] {
            let decision = gate.evaluate(path, Some("semana=2"), None).await;
            assert_eq!(
                decision,
                GateDecision::RedirectToLogin {
                    next: format!("{path}?semana=2")
                }
            );
        }
    }

    #[tokio::test]
    async fn unresolvable_session_redirects_to_login() {
        let gate = gate(UnlistedPaths::Allow).await;
        let decision = gate
            .evaluate("/aluno/dashboard", None, Some(&token("no-profile")))
            .await;
        assert_eq!(
            decision,
            GateDecision::RedirectToLogin {
                next: "/aluno/dashboard".to_string()
            }
        );
    }

    #[tokio::test]
    async fn professor_area_without_session_encodes_next() {
        let gate = gate(UnlistedPaths::Allow).await;
        let decision = gate.evaluate("/professor/alunos", None, None).await;
        assert_eq!(
            decision.location().as_deref(),
            Some("/login?next=%2Fprofessor%2Falunos")
        );
    }

    #[tokio::test]
    async fn aluno_in_professor_area_goes_home() {
        let gate = gate(UnlistedPaths::Allow).await;
        let decision = gate
            .evaluate("/professor/alunos", None, Some(&token("aluno")))
            .await;
        assert_eq!(decision, GateDecision::RedirectHome { role: Role::Aluno });
        assert_eq!(decision.location().as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn professor_in_aluno_area_goes_home() {
        let gate = gate(UnlistedPaths::Allow).await;
        let decision = gate
            .evaluate("/aluno/dashboard", None, Some(&token("prof")))
            .await;
        assert_eq!(
            decision.location().as_deref(),
            Some("/professor/dashboard")
        );
    }

    #[tokio::test]
    async fn matching_role_proceeds_with_user() {
        let gate = gate(UnlistedPaths::Allow).await;
        let decision = gate
            .evaluate("/professor/alunos", None, Some(&token("prof")))
            .await;
        match decision {
            GateDecision::Proceed { user: Some(user) } => {
                assert_eq!(user.subject_id, SubjectId::new("p1"));
                assert_eq!(user.role, Role::Professor);
            }
            other => panic!("expected proceed with user, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unlisted_paths_proceed_without_identity_check_by_default() {
        let gate = gate(UnlistedPaths::Allow).await;
        assert_eq!(gate.classify("/comunidade"), Access::Public);
        let decision = gate.evaluate("/comunidade", None, None).await;
        assert_eq!(decision, GateDecision::Proceed { user: None });
    }

    #[tokio::test]
    async fn unlisted_paths_require_any_role_when_denying_by_default() {
        let gate = gate(UnlistedPaths::Authenticated).await;
        assert!(matches!(
            gate.evaluate("/comunidade", None, None).await,
            GateDecision::RedirectToLogin { .. }
        ));
        assert!(matches!(
            gate.evaluate("/comunidade", None, Some(&token("prof"))).await,
            GateDecision::Proceed { user: Some(_) }
        ));
    }
}
