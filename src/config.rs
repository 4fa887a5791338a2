//! Engine configuration.
//!
//! Layering: built-in defaults, then an optional JSON file, then `MEDIASHIELD_*` environment
//! variables. Command-line flags are applied last by the binary.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::DEFAULT_MAX_PATHS;
use crate::error::{EngineError, EngineResult};
use crate::identity::{AppIdentity, StaticIdentityResolver};
use crate::paths::{self, AliasRoots};

pub const ENV_STORAGE_ROOT: &str = "MEDIASHIELD_STORAGE_ROOT";
pub const ENV_HOST_IDENTITY: &str = "MEDIASHIELD_HOST_IDENTITY";
pub const ENV_AUDIT_LOG: &str = "MEDIASHIELD_AUDIT_LOG";
pub const ENV_AUDIT: &str = "MEDIASHIELD_AUDIT";

pub const DEFAULT_STORAGE_ROOT: &str = "/storage/emulated/0";
pub const DEFAULT_HOST_IDENTITY: &str = "com.android.providers.downloads";
pub const DEFAULT_DOCUMENT_ROOT_ID: &str = "primary";

const DEFAULT_ALIAS_ROOTS: [&str; 3] = ["/sdcard", "/storage/self/primary", "/mnt/sdcard"];
const DEFAULT_INTERNAL_CALLERS: [&str; 2] = ["com.android.providers.media", "com.android.providers.media.module"];
const DEFAULT_STANDARD_DIRECTORIES: [&str; 13] = [
    "Music", "Podcasts", "Ringtones", "Alarms", "Notifications", "Pictures", "Movies", "Download",
    "DCIM", "Documents", "Audiobooks", "Recordings", "Android",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub max_paths: usize,
    /// JSON-lines file; records go to the tracing sink when unset.
    pub log_path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true, max_paths: DEFAULT_MAX_PATHS, log_path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canonical root of the shared storage volume.
    pub storage_root: String,
    /// Other spellings of `storage_root`.
    pub alias_roots: Vec<String>,
    /// Identity of the host component; directory creation it performs for itself is scoped by it.
    pub host_identity: String,
    /// Public top-level directories an app may create without a redirect.
    pub standard_directories: Vec<String>,
    /// Callers whose read results bypass the engine entirely.
    pub internal_callers: Vec<String>,
    pub document_root_id: String,
    /// Seed entries for the static identity resolver, numeric caller id to package.
    pub identities: HashMap<u32, String>,
    pub audit: AuditConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            alias_roots: DEFAULT_ALIAS_ROOTS.iter().map(|s| s.to_string()).collect(),
            host_identity: DEFAULT_HOST_IDENTITY.to_string(),
            standard_directories: DEFAULT_STANDARD_DIRECTORIES.iter().map(|s| s.to_string()).collect(),
            internal_callers: DEFAULT_INTERNAL_CALLERS.iter().map(|s| s.to_string()).collect(),
            document_root_id: DEFAULT_DOCUMENT_ROOT_ID.to_string(),
            identities: HashMap::new(),
            audit: AuditConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let cfg: EngineConfig = serde_json::from_str(json)?;
        cfg.validated()
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        debug!(target: "mediashield", "loading engine config from {}", path.display());
        Self::from_json(&text)
    }

    /// Defaults, optionally overlaid by a file, then by the environment.
    pub fn resolve(file: Option<&Path>) -> EngineResult<Self> {
        let base = match file {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        base.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay environment values read through `lookup`.
    pub fn apply_env_from<F>(mut self, lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_STORAGE_ROOT).filter(|v| !v.trim().is_empty()) {
            self.storage_root = root;
        }
        if let Some(host) = lookup(ENV_HOST_IDENTITY).filter(|v| !v.trim().is_empty()) {
            self.host_identity = host;
        }
        if let Some(log) = lookup(ENV_AUDIT_LOG).filter(|v| !v.trim().is_empty()) {
            self.audit.log_path = Some(log);
        }
        if let Some(flag) = lookup(ENV_AUDIT) {
            self.audit.enabled = parse_bool(&flag).ok_or_else(|| {
                EngineError::config("invalid_env".to_string(), format!("{}: expected a boolean, got '{}'", ENV_AUDIT, flag))
            })?;
        }
        self.validated()
    }

    fn validated(mut self) -> EngineResult<Self> {
        self.storage_root = paths::clean(&self.storage_root);
        if !self.storage_root.starts_with(paths::SEPARATOR) {
            return Err(EngineError::config(
                "invalid_storage_root".to_string(),
                format!("storage root must be an absolute path, got '{}'", self.storage_root),
            ));
        }
        if self.document_root_id.trim().is_empty() {
            return Err(EngineError::config("invalid_document_root", "document root id must not be empty"));
        }
        Ok(self)
    }

    pub fn alias_roots(&self) -> AliasRoots {
        AliasRoots::new(self.storage_root.clone(), self.alias_roots.iter().cloned())
    }

    pub fn host(&self) -> AppIdentity { AppIdentity::new(self.host_identity.clone()) }

    pub fn is_internal_caller(&self, caller: &AppIdentity) -> bool {
        self.internal_callers.iter().any(|c| c == caller.as_str())
    }

    pub fn identity_resolver(&self) -> StaticIdentityResolver {
        StaticIdentityResolver::from_map(self.identities.iter().map(|(uid, app)| (*uid, AppIdentity::new(app.clone()))))
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
