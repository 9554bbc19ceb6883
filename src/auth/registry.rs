//! Provider registry and resolution policy.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{AuthError, AuthResult};
use super::provider::{Provider, OPEN_VERSION, SSO_VERSION};

/// Immutable after start-up; resolution never mutates it.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default_version: String,
    fallback_version: String,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(default_version: &str) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_version: default_version.to_string(),
            fallback_version: OPEN_VERSION.to_string(),
        }
    }

    /// Registers under the provider's own version id, replacing any previous entry.
    #[must_use]
    pub fn register(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.version().to_string(), provider);
        self
    }

    #[must_use]
    pub fn with_fallback_version(mut self, version: &str) -> Self {
        self.fallback_version = version.to_string();
        self
    }

    #[must_use]
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// First match wins: requested version, usable SSO, configured default, fallback.
    ///
    /// # Errors
    /// `Configuration` when nothing matches; authentication is impossible.
    pub fn resolve(&self, requested: Option<&str>) -> AuthResult<Arc<dyn Provider>> {
        let requested = requested.map(str::trim).filter(|v| !v.is_empty());
        if let Some(provider) = requested.and_then(|v| self.providers.get(v)) {
            return Ok(provider.clone());
        }
        if let Some(provider) = self
            .providers
            .get(SSO_VERSION)
            .filter(|provider| provider.is_configured())
        {
            return Ok(provider.clone());
        }
        [self.default_version.as_str(), self.fallback_version.as_str()]
            .into_iter()
            .find_map(|version| self.providers.get(version))
            .cloned()
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "no authentication provider available (default: {}, registered: {:?})",
                    self.default_version,
                    self.versions()
                ))
            })
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.versions())
            .field("default_version", &self.default_version)
            .field("fallback_version", &self.fallback_version)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::provider::{KnownAccount, LoginIdentity, PASSWORD_VERSION};
    use crate::auth::request::RequestContext;
    use async_trait::async_trait;

    struct Fake {
        version: &'static str,
        configured: bool,
    }

    #[async_trait]
    impl Provider for Fake {
        fn version(&self) -> &str {
            self.version
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn authenticate(&self, _ctx: &RequestContext) -> AuthResult<Option<LoginIdentity>> {
            Ok(None)
        }

        fn login_redirect(&self, _ctx: &RequestContext) -> String {
            format!("/{}", self.version)
        }

        async fn list_known_accounts(&self) -> AuthResult<Vec<KnownAccount>> {
            Ok(Vec::new())
        }
    }

    fn fake(version: &'static str, configured: bool) -> Arc<dyn Provider> {
        Arc::new(Fake {
            version,
            configured,
        })
    }

    #[test]
    fn fallback_only_registry_resolves_fallback() {
        let registry = ProviderRegistry::new(PASSWORD_VERSION).register(fake(OPEN_VERSION, true));
        assert_eq!(registry.resolve(None).unwrap().version(), OPEN_VERSION);
        assert_eq!(registry.resolve(Some("")).unwrap().version(), OPEN_VERSION);
        assert_eq!(registry.resolve(Some("missing")).unwrap().version(), OPEN_VERSION);
    }

    #[test]
    fn usable_sso_beats_configured_default() {
        let registry = ProviderRegistry::new(PASSWORD_VERSION)
            .register(fake(PASSWORD_VERSION, true))
            .register(fake(SSO_VERSION, true))
            .register(fake(OPEN_VERSION, true));
        assert_eq!(registry.resolve(None).unwrap().version(), SSO_VERSION);
        // Deterministic across calls.
        assert_eq!(registry.resolve(None).unwrap().version(), SSO_VERSION);
        assert_eq!(
            registry.resolve(Some(PASSWORD_VERSION)).unwrap().version(),
            PASSWORD_VERSION
        );
    }

    #[test]
    fn unconfigured_sso_falls_through_to_default() {
        let registry = ProviderRegistry::new(PASSWORD_VERSION)
            .register(fake(PASSWORD_VERSION, true))
            .register(fake(SSO_VERSION, false));
        assert_eq!(registry.resolve(None).unwrap().version(), PASSWORD_VERSION);
        assert_eq!(registry.resolve(Some(SSO_VERSION)).unwrap().version(), SSO_VERSION);
    }

    #[test]
    fn empty_registry_is_a_configuration_error() {
        let registry = ProviderRegistry::new(PASSWORD_VERSION);
        assert!(matches!(registry.resolve(None), Err(AuthError::Configuration(_))));
    }
}
