//! Cache configuration.
//!
//! Resolved from the `[cache]` section of the application settings.

use super::keys::KeyPolicy;

const DEFAULT_TTL_SECONDS: u64 = 60;

/// Which cache store implementation backs the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Redis,
}

impl CacheBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Redis => "redis",
        }
    }
}

impl std::str::FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackendKind::Memory),
            "redis" => Ok(CacheBackendKind::Redis),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false, reads go straight to the store and writes skip invalidation.
    pub enabled: bool,
    /// Lifetime of every cache entry, in whole seconds.
    pub ttl_seconds: u64,
    pub key_policy: KeyPolicy,
    pub backend: CacheBackendKind,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            key_policy: KeyPolicy::Shared,
            backend: CacheBackendKind::Memory,
            redis_url: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl_seconds.get(),
            key_policy: settings.key_scope,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
        }
    }
}

impl CacheConfig {
    /// TTL clamped to the one-second minimum the stores accept.
    pub fn effective_ttl(&self) -> u64 {
        self.ttl_seconds.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.ttl_seconds, 60);
        assert_eq!(config.key_policy, KeyPolicy::Shared);
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn effective_ttl_clamps_to_min() {
        let config = CacheConfig {
            ttl_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_ttl(), 1);
    }

    #[test]
    fn backend_kind_parses_names() {
        assert_eq!("Redis".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Redis));
        assert!("memcached".parse::<CacheBackendKind>().is_err());
    }
}
