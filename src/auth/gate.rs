use spdlog::{info, warn};

use crate::auth::identity::{IdentityService, Session};
use crate::config;
use crate::error::{Error, Result};

/// The two desks behind the gate. The admin desk (posts grid, tours,
/// maintenance) only opens for the admin, the editor desk for any allowed author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Admin,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Author,
}

pub struct AuthGate {
    admin_email: String,
    allowed_emails: Vec<String>,
}

impl AuthGate {
    pub fn new(admin_email: &str, allowed_emails: &[String]) -> Self {
        AuthGate {
            admin_email: admin_email.trim().to_lowercase(),
            allowed_emails: allowed_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn from_config(identity: &config::Identity) -> Self {
        Self::new(&identity.admin_email, &identity.allowed_emails)
    }

    pub fn is_admin(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.admin_email)
    }

    pub fn role_of(&self, email: &str) -> Option<Role> {
        if self.is_admin(email) {
            return Some(Role::Admin);
        }
        let email = email.trim().to_lowercase();
        self.allowed_emails.contains(&email).then_some(Role::Author)
    }

    pub fn check(&self, panel: Panel, email: &str) -> Result<Role> {
        match (panel, self.role_of(email)) {
            (Panel::Admin, Some(Role::Admin)) => Ok(Role::Admin),
            (Panel::Editor, Some(role)) => Ok(role),
            _ => Err(Error::NotAllowed(email.to_string())),
        }
    }

    /// Refuses unknown emails before contacting the identity service, and signs
    /// out again if the account that came back is not allowed either.
    pub async fn sign_in(&self, identity: &dyn IdentityService, panel: Panel, email: &str, password: &str) -> Result<(Session, Role)> {
        if let Err(e) = self.check(panel, email) {
            warn!("Access denied for {} on the {:?} panel", email, panel);
            return Err(e);
        }

        let session = identity.sign_in(email, password).await?;
        match self.check(panel, &session.email) {
            Ok(role) => {
                info!("{} entered the {:?} panel as {:?}", session.email, panel, role);
                Ok((session, role))
            }
            Err(e) => {
                warn!("Signed in account {} is not allowed, signing out", session.email);
                identity.sign_out().await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::identity::SessionListener;

    struct FakeIdentity {
        returned_email: String,
        calls: Mutex<Vec<String>>,
    }

    impl FakeIdentity {
        fn new(returned_email: &str) -> Self {
            FakeIdentity {
                returned_email: returned_email.to_string(),
                calls: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
            self.calls.lock().unwrap().push(format!("sign_in {}", email));
            Ok(Session {
                email: self.returned_email.clone(),
                user_id: "uid".to_string(),
                id_token: "token".to_string(),
                refresh_token: String::new(),
            })
        }

        async fn sign_out(&self) -> Result<()> {
            self.calls.lock().unwrap().push("sign_out".to_string());
            Ok(())
        }

        fn current_session(&self) -> Option<Session> {
            None
        }

        fn on_session_change(&self, _listener: SessionListener) {}
    }

    fn gate() -> AuthGate {
        AuthGate::new("Boss@Example.com", &["writer@example.com".to_string()])
    }

    #[test]
    fn test_roles() {
        let gate = gate();
        assert_eq!(gate.role_of("boss@example.COM"), Some(Role::Admin));
        assert_eq!(gate.role_of(" Writer@example.com "), Some(Role::Author));
        assert_eq!(gate.role_of("other@example.com"), None);

        assert_eq!(gate.check(Panel::Editor, "writer@example.com").unwrap(), Role::Author);
        assert!(matches!(gate.check(Panel::Admin, "writer@example.com"), Err(Error::NotAllowed(_))));
        assert_eq!(gate.check(Panel::Admin, "boss@example.com").unwrap(), Role::Admin);
    }

    #[tokio::test]
    async fn test_unknown_email_never_reaches_identity() {
        let identity = FakeIdentity::new("other@example.com");
        let res = gate().sign_in(&identity, Panel::Editor, "other@example.com", "pw").await;
        assert!(matches!(res, Err(Error::NotAllowed(_))));
        assert!(identity.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_account_is_signed_out() {
        let identity = FakeIdentity::new("intruder@example.com");
        let res = gate().sign_in(&identity, Panel::Admin, "boss@example.com", "pw").await;
        assert!(matches!(res, Err(Error::NotAllowed(_))));
        assert_eq!(identity.calls(), vec!["sign_in boss@example.com", "sign_out"]);
    }

    #[tokio::test]
    async fn test_sign_in() {
        let identity = FakeIdentity::new("boss@example.com");
        let (session, role) = gate().sign_in(&identity, Panel::Admin, "boss@example.com", "pw").await.unwrap();
        assert_eq!(session.email, "boss@example.com");
        assert_eq!(role, Role::Admin);
    }
}
