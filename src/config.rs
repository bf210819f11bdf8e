//! Static configuration: the extension map, the file-kind catalogue and the
//! charsets that validate agent codes and revision codes.
//! Built once at startup and handed to every component by reference.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{AsicError, AsicResult};
use crate::extensions::ExtensionRegistry;
use crate::kinds::KindRegistry;

pub const BUILTIN_EXTENSION_MAP: &str = include_str!("../data/ASIC_FILE_EXTENSION_MAP.jsonl");
pub const BUILTIN_FILE_CONFIG: &str = include_str!("../data/ASIC_FILE_CONFIG.jsonl");

pub const ENV_EXTENSION_MAP: &str = "ASIC_EXTENSION_MAP";
pub const ENV_FILE_CONFIG: &str = "ASIC_FILE_CONFIG";

const DEFAULT_NORMALIZED_VERSION: &str = r"^-?[0-9]{3}$";
const DEFAULT_AGENT_CODE: &str = r"^[a-z0-9]{3,4}$";

/// Parse one JSON record per non-blank line; line numbers are 1-based.
pub fn read_jsonl<T: DeserializeOwned>(source_name: &str, text: &str) -> AsicResult<Vec<(usize, T)>> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() { continue; }
        let rec = serde_json::from_str::<T>(line).map_err(|e| AsicError::Config {
            source_name: source_name.to_string(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        out.push((idx + 1, rec));
    }
    if out.is_empty() {
        return Err(AsicError::Config { source_name: source_name.to_string(), line: 0, message: "no records".into() });
    }
    Ok(out)
}

/// Charsets for agent codes and revision codes. Historical publications disagree on the
/// agent width and on the sign of the revision code, so both stay replaceable.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub normalized_version: Regex,
    pub agent_code: Regex,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            normalized_version: Regex::new(DEFAULT_NORMALIZED_VERSION).expect("default version regex"),
            agent_code: Regex::new(DEFAULT_AGENT_CODE).expect("default agent regex"),
        }
    }
}

impl ValidationRules {
    pub fn new(normalized_version: &str, agent_code: &str) -> AsicResult<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| AsicError::Config { source_name: "validation rules".into(), line: 0, message: e.to_string() });
        Ok(Self { normalized_version: compile(normalized_version)?, agent_code: compile(agent_code)? })
    }

    /// Lower-case a user-supplied agent code and check it against `agent_code`.
    pub fn agent(&self, input: &str) -> AsicResult<String> {
        let a = input.trim().to_ascii_lowercase();
        if self.agent_code.is_match(&a) { Ok(a) } else {
            Err(AsicError::invalid("agent", input, format!("agent codes must match {}", self.agent_code.as_str())))
        }
    }
}

/// Where to read the two catalogues from; `None` means the embedded default.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub extension_map: Option<PathBuf>,
    pub file_config: Option<PathBuf>,
}

impl ConfigSources {
    pub fn from_env() -> Self {
        let path = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self { extension_map: path(ENV_EXTENSION_MAP), file_config: path(ENV_FILE_CONFIG) }
    }
}

#[derive(Debug)]
pub struct AsicConfig {
    pub extensions: ExtensionRegistry,
    pub kinds: KindRegistry,
    pub rules: ValidationRules,
}

impl AsicConfig {
    pub fn builtin() -> AsicResult<Self> {
        Self::load(&ConfigSources::default())
    }

    pub fn load(sources: &ConfigSources) -> AsicResult<Self> {
        let rules = ValidationRules::default();
        let (ext_name, ext_text) = read_source(sources.extension_map.as_deref(), "builtin:ASIC_FILE_EXTENSION_MAP.jsonl", BUILTIN_EXTENSION_MAP)?;
        let (kind_name, kind_text) = read_source(sources.file_config.as_deref(), "builtin:ASIC_FILE_CONFIG.jsonl", BUILTIN_FILE_CONFIG)?;
        let cfg = Self::from_sources(&ext_name, &ext_text, &kind_name, &kind_text, rules)?;
        info!(target: "asic", "loaded {} extensions from {}, {} kinds from {}", cfg.extensions.len(), ext_name, cfg.kinds.len(), kind_name);
        Ok(cfg)
    }

    pub fn from_sources(ext_name: &str, ext_text: &str, kind_name: &str, kind_text: &str, rules: ValidationRules) -> AsicResult<Self> {
        let extensions = ExtensionRegistry::from_jsonl(ext_name, ext_text, &rules)?;
        let kinds = KindRegistry::from_jsonl(kind_name, kind_text)?;
        Ok(Self { extensions, kinds, rules })
    }
}

fn read_source(path: Option<&Path>, builtin_name: &str, builtin: &str) -> AsicResult<(String, String)> {
    match path {
        Some(p) => {
            debug!(target: "asic", "reading configuration from {}", p.display());
            let text = std::fs::read_to_string(p).map_err(|e| AsicError::Config {
                source_name: p.display().to_string(),
                line: 0,
                message: e.to_string(),
            })?;
            Ok((p.display().to_string(), text))
        }
        None => Ok((builtin_name.to_string(), builtin.to_string())),
    }
}

#[cfg(test)]
#[path = "config/config_tests.rs"]
mod config_tests;
