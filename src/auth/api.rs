/// Credential / OTP API layer
///
/// Sign-in, one-time-code and session operations returning outcomes instead
/// of raising, with local validate-first checks, post-auth authorization
/// checks (ban / linked profile / block) and teardown on failure. A valid
/// credential check can therefore still end unsuccessful: the session is
/// established, inspected, and torn down again.
use crate::auth::attempts::LoginThrottle;
use crate::auth::messages::{categorize_auth_message, AuthErrorCategory};
use crate::baas::auth::BaasUser;
use crate::baas::{BaasClient, ProviderProfile};
use crate::error::{PartnerError, PartnerResult};
use crate::session::{SessionData, SessionHolder};
use crate::telemetry::{LoginEvent, TelemetryQueue};
use crate::validation::{validate_email, validate_password};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Required length of a one-time code
const OTP_CODE_LEN: usize = 6;

/// Backend seam for the auth flows
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn password_grant(&self, email: &str, password: &str) -> PartnerResult<SessionData>;
    async fn send_otp(&self, email: &str) -> PartnerResult<()>;
    async fn verify_otp(&self, email: &str, code: &str) -> PartnerResult<SessionData>;
    async fn sign_out(&self) -> PartnerResult<()>;
    async fn fetch_user(&self) -> PartnerResult<Option<BaasUser>>;
    async fn provider_profile_for(&self, user_id: &str) -> PartnerResult<Option<ProviderProfile>>;
    async fn account_ban_flag(&self, user_id: &str) -> PartnerResult<bool>;
}

#[async_trait]
impl AuthBackend for BaasClient {
    async fn password_grant(&self, email: &str, password: &str) -> PartnerResult<SessionData> {
        BaasClient::password_grant(self, email, password).await
    }

    async fn send_otp(&self, email: &str) -> PartnerResult<()> {
        BaasClient::send_otp(self, email).await
    }

    async fn verify_otp(&self, email: &str, code: &str) -> PartnerResult<SessionData> {
        BaasClient::verify_otp(self, email, code).await
    }

    async fn sign_out(&self) -> PartnerResult<()> {
        BaasClient::sign_out(self).await
    }

    async fn fetch_user(&self) -> PartnerResult<Option<BaasUser>> {
        BaasClient::fetch_user(self).await
    }

    async fn provider_profile_for(&self, user_id: &str) -> PartnerResult<Option<ProviderProfile>> {
        BaasClient::provider_profile_for(self, user_id).await
    }

    async fn account_ban_flag(&self, user_id: &str) -> PartnerResult<bool> {
        BaasClient::account_ban_flag(self, user_id).await
    }
}

/// Failure detail of an auth operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub code: String,
    pub message: String,
}

/// Result of an auth operation; `error` is set iff `success` is false
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<AuthFailure>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(AuthFailure {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    fn from_category(category: AuthErrorCategory) -> Self {
        Self::failed(category.code(), category.user_message())
    }
}

/// Auth API over an injected backend and session holder
pub struct AuthApi {
    backend: Arc<dyn AuthBackend>,
    session: Arc<SessionHolder>,
    throttle: LoginThrottle,
    telemetry: TelemetryQueue,
    device_id: String,
}

impl AuthApi {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        session: Arc<SessionHolder>,
        throttle: LoginThrottle,
        telemetry: TelemetryQueue,
        device_id: String,
    ) -> Self {
        Self {
            backend,
            session,
            throttle,
            telemetry,
            device_id,
        }
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        match self.throttle.status().await {
            Ok(status) if status.in_cooldown() => {
                return AuthOutcome::failed(
                    "rate_limited",
                    format!(
                        "Too many failed attempts. Please try again in {} minute(s)",
                        status.minutes_left()
                    ),
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("login throttle unavailable: {}", e),
        }

        if !validate_email(email) {
            return AuthOutcome::failed("invalid_email", "Please enter a valid email address");
        }
        if !validate_password(password) {
            return AuthOutcome::failed(
                "invalid_password",
                "Password must be at least 6 characters with letters and numbers",
            );
        }

        let session_data = match self.backend.password_grant(email.trim(), password).await {
            Ok(data) => data,
            Err(e) => {
                self.note_failure().await;
                return outcome_from_error(e);
            }
        };

        self.finish_sign_in(session_data).await
    }

    /// Request a one-time sign-in code
    pub async fn send_otp(&self, email: &str) -> AuthOutcome {
        if !validate_email(email) {
            return AuthOutcome::failed("invalid_email", "Please enter a valid email address");
        }

        match self.backend.send_otp(email.trim()).await {
            Ok(()) => AuthOutcome::ok(),
            Err(e) => outcome_from_error(e),
        }
    }

    /// Verify a one-time code and establish a session
    pub async fn verify_otp(&self, email: &str, code: &str) -> AuthOutcome {
        if !validate_email(email) {
            return AuthOutcome::failed("invalid_email", "Please enter a valid email address");
        }

        let code = code.trim();
        if code.is_empty() || code.chars().count() != OTP_CODE_LEN {
            return AuthOutcome::failed("otp_invalid", "Enter the 6-digit code");
        }

        let session_data = match self.backend.verify_otp(email.trim(), code).await {
            Ok(data) => data,
            Err(e) => return outcome_from_error(e),
        };

        self.finish_sign_in(session_data).await
    }

    /// Install the session, run the post-auth authorization checks, and
    /// tear the session back down if any of them fail
    async fn finish_sign_in(&self, session_data: SessionData) -> AuthOutcome {
        let user_id = session_data.user_id.clone();
        self.session.set_session(session_data);

        let verdict = self.check_account(&user_id).await;
        match verdict {
            Ok(None) => {}
            Ok(Some(failure)) => {
                self.teardown().await;
                self.note_failure().await;
                return AuthOutcome {
                    success: false,
                    error: Some(failure),
                };
            }
            Err(e) => {
                // Fail closed: an unverifiable account is not signed in
                self.teardown().await;
                self.note_failure().await;
                return outcome_from_error(e);
            }
        }

        if let Err(e) = self.throttle.clear().await {
            tracing::warn!("failed to clear login throttle: {}", e);
        }

        self.telemetry.enqueue_login(LoginEvent {
            user_id,
            device_id: self.device_id.clone(),
            at: Utc::now(),
        });

        AuthOutcome::ok()
    }

    /// Post-auth checks: account ban flag, linked profile, profile block
    async fn check_account(&self, user_id: &str) -> PartnerResult<Option<AuthFailure>> {
        if self.backend.account_ban_flag(user_id).await? {
            return Ok(Some(AuthFailure {
                code: "account_banned".to_string(),
                message: "This account has been suspended".to_string(),
            }));
        }

        match self.backend.provider_profile_for(user_id).await? {
            None => Ok(Some(AuthFailure {
                code: "profile_unlinked".to_string(),
                message: "No provider profile is linked to this account".to_string(),
            })),
            Some(profile) if profile.is_blocked => Ok(Some(AuthFailure {
                code: "profile_blocked".to_string(),
                message: "This profile has been blocked".to_string(),
            })),
            Some(_) => Ok(None),
        }
    }

    /// Sign out. The local session is always dropped, whatever the server says.
    pub async fn sign_out(&self) -> AuthOutcome {
        let result = self.backend.sign_out().await;
        self.session.clear();

        match result {
            Ok(()) => AuthOutcome::ok(),
            Err(e) => {
                tracing::error!("sign out failed: {}", e);
                AuthOutcome::failed("signout_error", "Failed to sign out")
            }
        }
    }

    /// Current session, if any
    pub fn session(&self) -> Option<SessionData> {
        self.session.current()
    }

    /// Current platform user; transport errors are swallowed into `None`
    pub async fn current_user(&self) -> Option<BaasUser> {
        match self.backend.fetch_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("get user failed: {}", e);
                None
            }
        }
    }

    /// Current provider profile; transport errors are swallowed into `None`
    pub async fn current_provider_profile(&self) -> Option<ProviderProfile> {
        let user = self.current_user().await?;

        match self.backend.provider_profile_for(&user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("get provider profile failed: {}", e);
                None
            }
        }
    }

    async fn teardown(&self) {
        if let Err(e) = self.backend.sign_out().await {
            tracing::warn!("teardown sign-out failed: {}", e);
        }
        self.session.clear();
    }

    async fn note_failure(&self) {
        if let Err(e) = self.throttle.record_failure().await {
            tracing::warn!("failed to record login failure: {}", e);
        }
    }
}

/// Normalize a backend error into a user-facing outcome
fn outcome_from_error(err: PartnerError) -> AuthOutcome {
    match err {
        PartnerError::AuthRejected(raw) => {
            AuthOutcome::from_category(categorize_auth_message(&raw))
        }
        PartnerError::RateLimited { .. } => {
            AuthOutcome::from_category(AuthErrorCategory::RateLimited)
        }
        PartnerError::Network(_) => AuthOutcome::from_category(AuthErrorCategory::NetworkError),
        other => {
            tracing::error!("auth backend failure: {}", other);
            AuthOutcome::from_category(AuthErrorCategory::AuthFailed)
        }
    }
}
