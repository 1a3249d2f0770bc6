use serde;
use serde_valid::Validate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::connectors::ConnectorConfig;
use crate::models::{FeatureKey, PlanTier, RouteDeclaration};
use crate::policy::PolicyTable;
use crate::services::onboarding_gate::{
    OnboardingGateConfig, DEFAULT_ONBOARDING_PATH, DEFAULT_PUBLIC_ROUTES,
};
use crate::services::session_registry::{RegistryLimits, DEFAULT_MAX_SESSIONS};
use crate::services::{ResolvePolicy, RouteGuard, RouteTable, RouteTableError};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    #[serde(default = "default_app_host")]
    pub app_host: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    #[serde(default)]
    pub connectors: ConnectorConfig,
    #[serde(default)]
    pub access: AccessSettings,
}

fn default_app_host() -> String {
    "127.0.0.1".to_string()
}

fn default_app_port() -> u16 {
    8000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_host: default_app_host(),
            app_port: default_app_port(),
            connectors: ConnectorConfig::default(),
            access: AccessSettings::default(),
        }
    }
}

/// Gating and onboarding behaviour
#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(default)]
pub struct AccessSettings {
    /// Paths the onboarding gate never checks (exact match)
    pub public_routes: Vec<String>,
    #[validate(pattern = r"^/")]
    pub onboarding_path: String,
    /// Delay before the single session re-read
    #[validate(maximum = 5000)]
    pub session_retry_delay_ms: u64,
    pub resolve_policy: ResolvePolicy,
    /// Tier for features missing from the policy table
    pub unknown_feature_plan: PlanTier,
    pub policy_overrides: HashMap<FeatureKey, PlanTier>,
    pub routes: Vec<RouteDeclaration>,
    /// Unused sessions are signed out after this long
    #[validate(minimum = 1)]
    pub session_idle_timeout_secs: u64,
    #[validate(minimum = 1)]
    pub session_sweep_interval_secs: u64,
    #[validate(minimum = 1)]
    pub max_sessions: usize,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            onboarding_path: DEFAULT_ONBOARDING_PATH.to_string(),
            session_retry_delay_ms: 200,
            resolve_policy: ResolvePolicy::default(),
            unknown_feature_plan: PlanTier::lowest(),
            policy_overrides: HashMap::new(),
            routes: Vec::new(),
            session_idle_timeout_secs: 30 * 60,
            session_sweep_interval_secs: 60,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl AccessSettings {
    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::standard()
            .clone()
            .with_fallback(self.unknown_feature_plan)
            .with_overrides(self.policy_overrides.clone())
    }

    pub fn gate_config(&self) -> OnboardingGateConfig {
        OnboardingGateConfig {
            public_routes: self.public_routes.iter().cloned().collect::<HashSet<_>>(),
            onboarding_path: self.onboarding_path.clone(),
            session_retry_delay: Duration::from_millis(self.session_retry_delay_ms),
        }
    }

    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            idle_timeout: Duration::from_secs(self.session_idle_timeout_secs),
            max_sessions: self.max_sessions,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    pub fn route_guard(&self) -> Result<RouteGuard, RouteTableError> {
        let table = RouteTable::from_declarations(&self.routes)?;
        Ok(RouteGuard::new(table, Arc::new(self.policy_table())))
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // `configuration.yaml` is optional; ACCESSGATE__APP_PORT=9000 style
    // variables override it
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("ACCESSGATE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: Settings = settings.try_deserialize()?;
    config
        .access
        .validate()
        .map_err(|err| config::ConfigError::Message(format!("access: {}", err)))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_permissive_policy() {
        let access = AccessSettings::default();
        let policy = access.policy_table();
        assert_eq!(
            policy.min_plan_for_feature(&FeatureKey::from("library.loans")),
            PlanTier::Free
        );
        assert_eq!(
            access.gate_config().session_retry_delay,
            Duration::from_millis(200)
        );
        assert!(access.gate_config().public_routes.contains("/login"));
        assert_eq!(
            access.registry_limits().idle_timeout,
            Duration::from_secs(1800)
        );
        assert_eq!(access.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_and_fallback() {
        let access = AccessSettings {
            unknown_feature_plan: PlanTier::Enterprise,
            policy_overrides: HashMap::from([(FeatureKey::AnalyticsView, PlanTier::Starter)]),
            ..AccessSettings::default()
        };
        let policy = access.policy_table();
        assert_eq!(
            policy.min_plan_for_feature(&FeatureKey::AnalyticsView),
            PlanTier::Starter
        );
        assert_eq!(
            policy.min_plan_for_feature(&FeatureKey::from("library.loans")),
            PlanTier::Enterprise
        );
    }

    #[test]
    fn test_retry_delay_is_bounded() {
        let access = AccessSettings {
            session_retry_delay_ms: 60_000,
            ..AccessSettings::default()
        };
        assert!(access.validate().is_err());
        assert!(AccessSettings::default().validate().is_ok());

        let access = AccessSettings {
            session_sweep_interval_secs: 0,
            ..AccessSettings::default()
        };
        assert!(access.validate().is_err());
    }

    #[test]
    fn test_settings_from_yaml() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
app_port: 9100
access:
  onboarding_path: /welcome
  resolve_policy: last_write_wins
  routes:
    - path: /analytics
      moduleKey: analytics
      feature: analytics.view
"#,
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.app_port, 9100);
        assert_eq!(settings.app_host, "127.0.0.1");
        assert_eq!(settings.access.onboarding_path, "/welcome");
        assert_eq!(settings.access.resolve_policy, ResolvePolicy::LastWriteWins);
        assert_eq!(settings.access.routes.len(), 1);
        assert!(settings.access.public_routes.contains(&"/pricing".to_string()));
        assert_eq!(settings.access.route_guard().unwrap().table().len(), 1);
    }
}
