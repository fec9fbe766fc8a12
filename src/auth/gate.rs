/// Authorization gate
///
/// Decides, on every app "show" event, whether the signed-in account may use
/// the app: the account must exist and have a linked, unblocked provider
/// profile. Verdicts are cached device-locally; checks are guarded so at
/// most one runs at a time, and overlapping triggers are dropped rather
/// than queued. Failures are fail-closed.
use crate::auth::api::AuthBackend;
use crate::auth::cache::{AuthCacheEntry, AuthCacheStore, AUTH_CACHE_TTL_HOURS};
use crate::error::PartnerResult;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Gate lifecycle states observed by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No check has completed yet; first render blocks on this
    Uninitialized,
    /// The first (and only the first) check is in progress
    Checking,
    Authorized,
    Unauthorized,
}

/// Where to send the user when a check comes back unauthorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRoute {
    /// No account: back to sign-in
    SignIn,
    /// Unlinked or blocked profile: the unauthorized screen
    Blocked,
}

/// Result of one `on_show` trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Authorized { profile_id: Uuid },
    Unauthorized { route: GateRoute },
    /// Another check was already in flight; this trigger was dropped
    Skipped,
}

/// The gate itself
pub struct AuthGate {
    backend: Arc<dyn AuthBackend>,
    cache: AuthCacheStore,
    in_flight: AtomicBool,
    state: watch::Sender<GateState>,
}

impl AuthGate {
    pub fn new(backend: Arc<dyn AuthBackend>, cache: AuthCacheStore) -> Self {
        let (state, _) = watch::channel(GateState::Uninitialized);
        Self {
            backend,
            cache,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    /// Observe gate state transitions
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Current gate state
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Run one authorization check for a show event (foreground, tab focus,
    /// first mount). At most one check runs at a time; a trigger arriving
    /// while one is in flight is dropped.
    pub async fn on_show(&self) -> GateDecision {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("authorization check already in flight, dropping trigger");
            return GateDecision::Skipped;
        }

        // Only the very first check surfaces a loading state; later checks
        // run silently and can only flip an authorized UI to unauthorized.
        if self.state() == GateState::Uninitialized {
            let _ = self.state.send(GateState::Checking);
        }

        let decision = self.run_check().await;

        let next = match decision {
            GateDecision::Authorized { .. } => GateState::Authorized,
            GateDecision::Unauthorized { .. } => GateState::Unauthorized,
            GateDecision::Skipped => unreachable!("run_check never skips"),
        };
        let _ = self.state.send(next);

        self.in_flight.store(false, Ordering::SeqCst);
        decision
    }

    async fn run_check(&self) -> GateDecision {
        // Cached verdict first; a fresh entry means no network at all
        match self.cache.read().await {
            Ok(Some(entry)) => {
                tracing::debug!(
                    "adopting cached authorization verdict (fresh within {} hours)",
                    AUTH_CACHE_TTL_HOURS
                );
                if entry.is_authorized {
                    return GateDecision::Authorized {
                        profile_id: entry.profile_id,
                    };
                }
                return GateDecision::Unauthorized {
                    route: GateRoute::Blocked,
                };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("authorization cache unavailable: {}", e),
        }

        match self.fresh_check().await {
            Ok(decision) => decision,
            Err(e) => {
                // Fail closed
                tracing::error!("authorization check failed: {}", e);
                if let Err(e) = self.cache.clear().await {
                    tracing::warn!("failed to clear authorization cache: {}", e);
                }
                GateDecision::Unauthorized {
                    route: GateRoute::Blocked,
                }
            }
        }
    }

    async fn fresh_check(&self) -> PartnerResult<GateDecision> {
        let Some(user) = self.backend.fetch_user().await? else {
            self.cache.clear().await?;
            return Ok(GateDecision::Unauthorized {
                route: GateRoute::SignIn,
            });
        };

        let profile = self.backend.provider_profile_for(&user.id).await?;
        let profile = match profile {
            Some(profile) if !profile.is_blocked => profile,
            _ => {
                self.cache.clear().await?;
                return Ok(GateDecision::Unauthorized {
                    route: GateRoute::Blocked,
                });
            }
        };

        let entry = AuthCacheEntry {
            account_id: user.id,
            profile_id: profile.id,
            is_authorized: true,
            is_blocked: false,
            checked_at: Utc::now(),
        };
        self.cache.write(&entry).await?;

        tracing::info!(
            "authorization confirmed; caching verdict for {} hours",
            AUTH_CACHE_TTL_HOURS
        );

        Ok(GateDecision::Authorized {
            profile_id: profile.id,
        })
    }
}
