use std::sync::Arc;

use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};

use crate::tenant::TenantManager;

/// Shared-password auth. Besides the service user, only logins that name
/// an active account of the target tenant get as far as the password check.
pub struct ReservadAuthSource {
    password: String,
    service_user: String,
    tenants: Arc<TenantManager>,
}

impl std::fmt::Debug for ReservadAuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservadAuthSource")
            .field("service_user", &self.service_user)
            .finish_non_exhaustive()
    }
}

impl ReservadAuthSource {
    pub fn new(password: String, service_user: String, tenants: Arc<TenantManager>) -> Self {
        Self {
            password,
            service_user,
            tenants,
        }
    }

    fn refuse(&self, user: &str, reason: String) -> PgWireError {
        metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
        tracing::debug!("login refused for {user}: {reason}");
        PgWireError::UserError(Box::new(ErrorInfo::new(
            "FATAL".into(),
            "28000".into(),
            format!("login refused for {user}"),
        )))
    }
}

#[async_trait]
impl AuthSource for ReservadAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        let user = login.user().unwrap_or_default();
        if user != self.service_user {
            let tenant = login.database().unwrap_or("default");
            // Only the service user may bring a new tenant into existence,
            // and only once authenticated.
            let engine = self
                .tenants
                .get_existing(tenant)
                .map_err(|e| self.refuse(user, e.to_string()))?
                .ok_or_else(|| self.refuse(user, format!("unknown tenant {tenant}")))?;
            engine
                .actor_for_login(user)
                .map_err(|e| self.refuse(user, e.to_string()))?;
        }
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn debug_output_hides_password() {
        let dir = std::env::temp_dir().join("reservad_test_auth");
        let tenants = Arc::new(TenantManager::new(dir, 1000, Duration::from_secs(60)));
        let source = ReservadAuthSource::new("s3cret".into(), "reservad".into(), tenants);
        let shown = format!("{source:?}");
        assert!(shown.contains("reservad"));
        assert!(!shown.contains("s3cret"));
    }
}
