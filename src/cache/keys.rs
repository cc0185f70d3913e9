//! Cache key derivation.
//!
//! Keys come in two families, `collection:{resource}` and `item:{resource}:{id}`, each
//! optionally suffixed with a caller fingerprint. Every segment is drawn from a colon-free
//! alphabet and each family has a fixed segment count, so distinct inputs never collide.

use std::fmt;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Resource namespaces that may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    Post,
    Role,
    Permission,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Post => "post",
            ResourceKind::Role => "role",
            ResourceKind::Permission => "permission",
        }
    }
}

/// Whether a key addresses a whole collection or a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    Collection,
    Item(i64),
}

/// One-way hash of a bearer credential, safe to embed in a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerFingerprint(String);

impl CallerFingerprint {
    pub fn from_credential(credential: &str) -> Self {
        let digest = Sha256::digest(credential.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the storage key for a resource.
pub fn derive_key(
    resource: ResourceKind,
    scope: ResourceScope,
    fingerprint: Option<&CallerFingerprint>,
) -> String {
    let mut key = family_prefix(resource, scope);
    if let Some(fingerprint) = fingerprint {
        key.push(':');
        key.push_str(fingerprint.as_str());
    }
    key
}

fn family_prefix(resource: ResourceKind, scope: ResourceScope) -> String {
    match scope {
        ResourceScope::Collection => format!("collection:{}", resource.as_str()),
        ResourceScope::Item(id) => format!("item:{}:{id}", resource.as_str()),
    }
}

/// Process-wide choice between shared and caller-scoped read keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    #[default]
    Shared,
    PerCaller,
}

impl KeyPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyPolicy::Shared => "shared",
            KeyPolicy::PerCaller => "per_caller",
        }
    }

    /// Key a caller reads through.
    pub fn read_key(
        self,
        resource: ResourceKind,
        scope: ResourceScope,
        fingerprint: &CallerFingerprint,
    ) -> String {
        match self {
            KeyPolicy::Shared => derive_key(resource, scope, None),
            KeyPolicy::PerCaller => derive_key(resource, scope, Some(fingerprint)),
        }
    }

    /// Store operation that removes every cached copy of `target`.
    pub fn invalidation(self, target: InvalidationTarget) -> Invalidation {
        let base = family_prefix(target.resource, target.scope);
        match self {
            KeyPolicy::Shared => Invalidation::Key(base),
            KeyPolicy::PerCaller => Invalidation::Prefix(format!("{base}:")),
        }
    }
}

impl std::str::FromStr for KeyPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(KeyPolicy::Shared),
            "per_caller" | "per-caller" => Ok(KeyPolicy::PerCaller),
            other => Err(format!("unknown key scope `{other}`")),
        }
    }
}

/// A resource whose cached copies a write makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidationTarget {
    pub resource: ResourceKind,
    pub scope: ResourceScope,
}

impl InvalidationTarget {
    pub fn collection(resource: ResourceKind) -> Self {
        Self {
            resource,
            scope: ResourceScope::Collection,
        }
    }

    pub fn item(resource: ResourceKind, id: i64) -> Self {
        Self {
            resource,
            scope: ResourceScope::Item(id),
        }
    }

    /// The item itself and the collection that lists it.
    pub fn item_and_collection(resource: ResourceKind, id: i64) -> Vec<Self> {
        vec![Self::item(resource, id), Self::collection(resource)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(String),
    Prefix(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_formats_both_families() {
        assert_eq!(
            derive_key(ResourceKind::Post, ResourceScope::Collection, None),
            "collection:post"
        );
        assert_eq!(
            derive_key(ResourceKind::Post, ResourceScope::Item(42), None),
            "item:post:42"
        );
    }

    #[test]
    fn fingerprint_is_hex_sha256_and_hides_credential() {
        let fingerprint = CallerFingerprint::from_credential("secret-token");
        assert_eq!(fingerprint.as_str().len(), 64);
        assert!(fingerprint.as_str().chars().all(|c| c.is_ascii_hexdigit()));

        let key = derive_key(
            ResourceKind::Post,
            ResourceScope::Collection,
            Some(&fingerprint),
        );
        assert!(!key.contains("secret-token"));
        assert_eq!(key, format!("collection:post:{fingerprint}"));
    }

    #[test]
    fn derive_key_is_stable_and_distinct() {
        let a = CallerFingerprint::from_credential("a");
        let b = CallerFingerprint::from_credential("b");
        let inputs = [
            (ResourceKind::Post, ResourceScope::Collection, None),
            (ResourceKind::Post, ResourceScope::Collection, Some(&a)),
            (ResourceKind::Post, ResourceScope::Collection, Some(&b)),
            (ResourceKind::Post, ResourceScope::Item(1), None),
            (ResourceKind::Post, ResourceScope::Item(11), None),
            (ResourceKind::Post, ResourceScope::Item(1), Some(&a)),
            (ResourceKind::User, ResourceScope::Item(1), None),
            (ResourceKind::Role, ResourceScope::Collection, None),
        ];

        let keys: Vec<String> = inputs
            .iter()
            .map(|(resource, scope, fingerprint)| derive_key(*resource, *scope, *fingerprint))
            .collect();
        let unique: std::collections::HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());

        assert_eq!(
            derive_key(ResourceKind::Post, ResourceScope::Item(1), Some(&a)),
            derive_key(ResourceKind::Post, ResourceScope::Item(1), Some(&a)),
        );
    }

    #[test]
    fn shared_policy_ignores_fingerprint() {
        let fingerprint = CallerFingerprint::from_credential("token");
        assert_eq!(
            KeyPolicy::Shared.read_key(ResourceKind::Post, ResourceScope::Item(3), &fingerprint),
            "item:post:3"
        );
        assert_eq!(
            KeyPolicy::Shared.invalidation(InvalidationTarget::item(ResourceKind::Post, 3)),
            Invalidation::Key("item:post:3".to_string())
        );
    }

    #[test]
    fn per_caller_invalidation_covers_every_fingerprint() {
        let fingerprint = CallerFingerprint::from_credential("token");
        let key = KeyPolicy::PerCaller.read_key(
            ResourceKind::Post,
            ResourceScope::Collection,
            &fingerprint,
        );
        let Invalidation::Prefix(prefix) = KeyPolicy::PerCaller
            .invalidation(InvalidationTarget::collection(ResourceKind::Post))
        else {
            panic!("per-caller invalidation must clear by prefix");
        };
        assert!(key.starts_with(&prefix));

        let Invalidation::Prefix(item_prefix) =
            KeyPolicy::PerCaller.invalidation(InvalidationTarget::item(ResourceKind::Post, 1))
        else {
            panic!("per-caller invalidation must clear by prefix");
        };
        let other_item =
            KeyPolicy::PerCaller.read_key(ResourceKind::Post, ResourceScope::Item(11), &fingerprint);
        assert!(!other_item.starts_with(&item_prefix));
    }

    #[test]
    fn key_policy_parses_config_values() {
        assert_eq!("shared".parse::<KeyPolicy>(), Ok(KeyPolicy::Shared));
        assert_eq!("per-caller".parse::<KeyPolicy>(), Ok(KeyPolicy::PerCaller));
        assert!("global".parse::<KeyPolicy>().is_err());
    }
}
