//! API key registry.
//!
//! Records are indexed by the SHA-256 of their secret so lookups never branch
//! on secret bytes; the final match is confirmed with a constant-time compare.
//! Reads vastly outnumber writes, so the index sits behind a `parking_lot::RwLock`.

mod store;


use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use subtle::ConstantTimeEq;

use switchyard_types::models::key::ALL_MODELS;
use switchyard_types::models::{KeyRegistryConfig, SeedKey};
use switchyard_types::{ApiKeyRecord, GatewayError, GatewayResult, Permission};

use crate::error::AppResult;

const KEY_PREFIX: &str = "sy_";
const KEY_RANDOM_LEN: usize = 32;
const BOOTSTRAP_OWNER: &str = "default-admin";

pub struct KeyRegistry {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
    store_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Generate a new opaque secret from the thread-local CSPRNG.
pub fn generate_api_key() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", KEY_PREFIX, random)
}

impl KeyRegistry {
    /// Empty in-memory registry.
    pub fn new() -> Self {
        Self { keys: RwLock::new(HashMap::new()), store_path: None, persist_lock: Mutex::new(()) }
    }

    /// Registry backed by a JSON file. Existing records are loaded from it.
    pub fn with_store(path: PathBuf) -> AppResult<Self> {
        let records = store::load_records(&path)?;
        let registry = Self {
            keys: RwLock::new(HashMap::new()),
            store_path: Some(path),
            persist_lock: Mutex::new(()),
        };
        {
            let mut keys = registry.keys.write();
            for record in records {
                keys.insert(key_digest(&record.key), record);
            }
        }
        tracing::info!("[KeyRegistry] Loaded {} key(s) from store", registry.len());
        Ok(registry)
    }

    /// Build the registry from configuration: store, seed keys, then bootstrap admin.
    pub fn from_config(config: &KeyRegistryConfig) -> AppResult<Self> {
        let registry = match &config.store_path {
            Some(path) => Self::with_store(path.clone())?,
            None => Self::new(),
        };

        for seed in &config.seed {
            registry.insert_seed(seed);
        }

        if config.bootstrap_admin && registry.is_empty() {
            match registry.create(BOOTSTRAP_OWNER, [Permission::Admin]) {
                Ok(record) => {
                    tracing::warn!(
                        "[KeyRegistry] No keys configured, generated bootstrap admin key: {}",
                        record.key
                    );
                },
                Err(e) => tracing::error!("[KeyRegistry] Failed to create bootstrap key: {}", e),
            }
        }

        Ok(registry)
    }

    /// Insert a configured key. An existing record with the same secret is kept.
    pub fn insert_seed(&self, seed: &SeedKey) -> ApiKeyRecord {
        let key = seed.key.clone().filter(|k| !k.is_empty()).unwrap_or_else(generate_api_key);
        let digest = key_digest(&key);

        let record = {
            let mut keys = self.keys.write();
            keys.entry(digest)
                .or_insert_with(|| ApiKeyRecord {
                    key,
                    owner: seed.owner.clone(),
                    permissions: normalize_permissions(seed.permissions.iter().copied()),
                    active: true,
                    created_at: Utc::now(),
                    allowed_models: normalize_models(seed.allowed_models.clone()),
                    rate_limit: seed.rate_limit.filter(|rpm| *rpm > 0),
                })
                .clone()
        };
        self.persist();
        record
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Resolve a presented secret to its active record.
    pub fn authenticate(&self, key: &str) -> GatewayResult<ApiKeyRecord> {
        let keys = self.keys.read();
        match keys.get(&key_digest(key)) {
            Some(record) if constant_time_compare(&record.key, key) => {
                if record.active {
                    Ok(record.clone())
                } else {
                    tracing::debug!(owner = %record.owner, "[KeyRegistry] Inactive key presented");
                    Err(GatewayError::unauthorized("Invalid or inactive API key"))
                }
            },
            _ => Err(GatewayError::unauthorized("Invalid or inactive API key")),
        }
    }

    /// Check a permission. Admin keys satisfy every requirement.
    pub fn authorize(&self, record: &ApiKeyRecord, required: Permission) -> GatewayResult<()> {
        if record.grants(required) {
            Ok(())
        } else {
            Err(GatewayError::forbidden(format!("{} privileges required", required)))
        }
    }

    pub fn create<I>(&self, owner: &str, permissions: I) -> GatewayResult<ApiKeyRecord>
    where
        I: IntoIterator<Item = Permission>,
    {
        self.create_with_limit(owner, permissions, vec![ALL_MODELS.to_string()], None)
    }

    /// Issue a new key restricted to `allowed_models`, whose owner is held to
    /// `rate_limit` requests per minute when set.
    pub fn create_with_limit<I>(
        &self,
        owner: &str,
        permissions: I,
        allowed_models: Vec<String>,
        rate_limit: Option<u32>,
    ) -> GatewayResult<ApiKeyRecord>
    where
        I: IntoIterator<Item = Permission>,
    {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(GatewayError::invalid_input("owner must not be empty"));
        }
        if rate_limit == Some(0) {
            return Err(GatewayError::invalid_input("rate_limit must be at least 1 request per minute"));
        }

        let record = ApiKeyRecord {
            key: generate_api_key(),
            owner: owner.to_string(),
            permissions: normalize_permissions(permissions),
            active: true,
            created_at: Utc::now(),
            allowed_models: normalize_models(allowed_models),
            rate_limit,
        };

        self.keys.write().insert(key_digest(&record.key), record.clone());
        tracing::info!(owner = %record.owner, key = %record.masked_key(), "[KeyRegistry] Created API key");
        self.persist();
        Ok(record)
    }

    /// Deactivate a key. Deactivating an inactive key succeeds without change.
    pub fn deactivate(&self, key: &str) -> GatewayResult<()> {
        let changed = {
            let mut keys = self.keys.write();
            match keys.get_mut(&key_digest(key)) {
                Some(record) if constant_time_compare(&record.key, key) => {
                    let was_active = record.active;
                    record.active = false;
                    if was_active {
                        tracing::info!(owner = %record.owner, key = %record.masked_key(), "[KeyRegistry] Deactivated API key");
                    }
                    was_active
                },
                _ => return Err(GatewayError::not_found("API key")),
            }
        };

        if changed {
            self.persist();
        }
        Ok(())
    }

    /// All records, active or not, oldest first.
    pub fn list(&self) -> Vec<ApiKeyRecord> {
        let mut records: Vec<ApiKeyRecord> = self.keys.read().values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.owner.cmp(&b.owner)));
        records
    }

    fn persist(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        let _guard = self.persist_lock.lock();
        let records = self.list();
        if let Err(e) = store::save_records(path, &records) {
            tracing::error!("[KeyRegistry] Failed to persist keys to {}: {}", path.display(), e);
        }
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_permissions<I>(permissions: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = Permission>,
{
    let mut set: BTreeSet<Permission> = permissions.into_iter().collect();
    if set.is_empty() {
        set.insert(Permission::Standard);
    }
    set
}

fn normalize_models(models: Vec<String>) -> Vec<String> {
    let models: Vec<String> =
        models.into_iter().map(|m| m.trim().to_string()).filter(|m| !m.is_empty()).collect();
    if models.is_empty() {
        vec![ALL_MODELS.to_string()]
    } else {
        models
    }
}
