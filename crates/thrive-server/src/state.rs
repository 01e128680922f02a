use std::sync::Arc;
use std::time::Duration;

use thrive_api::ApiError;
use thrive_auth::{AuthContext, AuthState, JwtService, LogOtpSender, OtpPolicy, OtpSender};
use thrive_core::EventBroadcaster;
use thrive_core::model::User;
use thrive_storage::prelude::*;

use crate::config::AppConfig;
use crate::services::{
    AchievementService, AdvisorChain, HttpAdvisor, NotificationService, PlanCache, TaskAdvisor,
    TranscriptionClient,
};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: DynStorage,
    pub jwt: Arc<JwtService>,
    pub auth: AuthState,
    pub otp_policy: OtpPolicy,
    pub otp_sender: Arc<dyn OtpSender>,
    pub events: Arc<EventBroadcaster>,
    pub notifier: NotificationService,
    pub achievements: AchievementService,
    pub advisor: Arc<dyn TaskAdvisor>,
    pub plans: PlanCache,
    /// `None` when `voice.endpoint` is not configured.
    pub voice: Option<TranscriptionClient>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: DynStorage) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("thrive-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let jwt = Arc::new(JwtService::new(
            &config.auth.jwt_secret,
            config.auth.issuer.clone(),
            config.auth.token_ttl_secs,
        ));
        let events = EventBroadcaster::new_shared();
        let notifier = NotificationService::new(storage.clone(), events.clone());
        let achievements = AchievementService::new(storage.clone(), notifier.clone(), events.clone());

        let remote: Option<Arc<dyn TaskAdvisor>> = config.ai.endpoint.as_ref().map(|endpoint| {
            Arc::new(HttpAdvisor::new(
                http.clone(),
                endpoint.clone(),
                config.ai.api_key.clone(),
                Duration::from_millis(config.ai.timeout_ms),
            )) as Arc<dyn TaskAdvisor>
        });
        let voice = config.voice.endpoint.as_ref().map(|endpoint| {
            TranscriptionClient::new(
                http.clone(),
                endpoint.clone(),
                config.voice.api_key.clone(),
                Duration::from_millis(config.voice.timeout_ms),
            )
        });

        Ok(Self {
            storage,
            auth: AuthState::new(jwt.clone()),
            jwt,
            otp_policy: config.auth.otp_policy(),
            otp_sender: Arc::new(LogOtpSender),
            events,
            notifier,
            achievements,
            advisor: Arc::new(AdvisorChain::new(remote)),
            plans: PlanCache::new(config.ai.plan_cache_capacity, config.ai.plan_ttl_secs),
            voice,
            config: Arc::new(config),
        })
    }

    pub fn with_otp_sender(mut self, sender: Arc<dyn OtpSender>) -> Self {
        self.otp_sender = sender;
        self
    }

    /// Loads the caller's account. A valid token for a deleted account is
    /// treated as unauthenticated.
    pub async fn current_user(&self, ctx: &AuthContext) -> Result<User, ApiError> {
        self.storage
            .get_user(ctx.user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
    }

    /// Country used for formatting: the user's saved one or the configured default.
    pub fn country_of<'a>(&'a self, user: &'a User) -> &'a str {
        user.country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.config.localization.default_country)
    }
}
