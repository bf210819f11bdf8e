//! Month listings
//! --------------
//! Expands location templates into literal directories, lists each directory once per
//! invocation, classifies the entries and narrows them to the requested month and revision.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::calendar::YearMonth;
use crate::config::AsicConfig;
use crate::error::{AsicError, AsicResult};
use crate::filters::{filter_by_extension, filter_by_month, keep_latest_versions};
use crate::kinds::{KindEntry, KindId};
use crate::metadata::{classify, normalize_remote_path, AsicFile};
use crate::template::{Template, TemplateValue, TemplateValues};
use crate::transport::Transport;

/// One literal directory to list: a month, a location template and optional extension/agent.
#[derive(Debug, Clone)]
pub struct LocationQuery<'a> {
    pub month: YearMonth,
    pub location_template: &'a Template,
    pub extension: Option<String>,
    pub agent: Option<String>,
}

impl LocationQuery<'_> {
    pub fn values(&self) -> TemplateValues {
        let mut v = TemplateValues::new();
        v.insert("location_year".into(), TemplateValue::from(self.month.year));
        v.insert("location_month".into(), TemplateValue::from(self.month.month));
        if let Some(a) = &self.agent {
            v.insert("location_agent".into(), TemplateValue::from(a.as_str()));
        }
        if let Some(e) = &self.extension {
            v.insert("extension".into(), TemplateValue::from(e.trim_start_matches('.')));
        }
        v
    }

    pub fn expand(&self) -> AsicResult<String> { self.location_template.render(&self.values()) }
}

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub months: Vec<YearMonth>,
    /// Empty means every registered kind.
    pub kinds: Vec<KindId>,
    /// Empty means no extension filter.
    pub extensions: Vec<String>,
    pub agent: Option<String>,
    pub latest: bool,
}

/// Listing front end over one reconnecting session, with the per-invocation listing cache.
pub struct RemoteCatalog<T: Transport> {
    transport: T,
    listings: HashMap<String, Vec<String>>,
}

impl<T: Transport> RemoteCatalog<T> {
    pub fn new(transport: T) -> Self { Self { transport, listings: HashMap::new() } }

    pub fn transport_mut(&mut self) -> &mut T { &mut self.transport }

    /// Literal locations listed so far.
    pub fn cached_locations(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.listings.keys().map(|k| k.as_str()).collect();
        v.sort();
        v
    }

    /// List a literal directory at most once. A directory that does not exist lists as empty.
    pub fn list_location(&mut self, literal: &str) -> AsicResult<&[String]> {
        if !self.listings.contains_key(literal) {
            let entries = match self.transport.list_directory(literal) {
                Ok(entries) => entries.iter().map(|e| qualify(literal, e)).collect(),
                Err(AsicError::NotFound { path }) => {
                    warn!(target: "asic::listing", "remote location {} does not exist", path);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            self.listings.insert(literal.to_string(), entries);
        } else {
            debug!(target: "asic::listing", "listing cache hit for {}", literal);
        }
        Ok(self.listings.get(literal).map(|v| v.as_slice()).unwrap_or(&[]))
    }

    pub fn list_supported_files(&mut self, cfg: &AsicConfig, req: &ListRequest) -> AsicResult<Vec<AsicFile>> {
        let candidates: Vec<&KindEntry> = cfg.kinds.candidates(&req.kinds)?;
        let agent = req.agent.as_deref().map(|a| cfg.rules.agent(a)).transpose()?;
        let extensions: Vec<Option<String>> = if req.extensions.is_empty() {
            vec![None]
        } else {
            req.extensions.iter().map(|e| cfg.extensions.normalize(e).map(Some)).collect::<AsicResult<_>>()?
        };

        let mut locations: Vec<&Template> = Vec::new();
        for entry in &candidates {
            let t = entry.descriptor.location_template();
            if !locations.iter().any(|l| l.as_str() == t.as_str()) { locations.push(t); }
        }

        let mut out: Vec<AsicFile> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for month in &req.months {
            for location_template in locations.iter().copied() {
                for extension in &extensions {
                    let query = LocationQuery { month: *month, location_template, extension: extension.clone(), agent: agent.clone() };
                    let literal = match query.expand() {
                        Ok(l) => l,
                        Err(AsicError::Template { template, placeholder }) => {
                            warn!(target: "asic::listing", "skipping {} for {}: no value for {}", template, month, placeholder);
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    let files = match self.files_in(&literal, &candidates, cfg, *month, extension.as_deref()) {
                        Ok(files) => files,
                        Err(e @ AsicError::ConflictingFields { .. }) => {
                            warn!(target: "asic::listing", "skipping {} for {}: {}", literal, month, e);
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    if files.is_empty() {
                        warn!(target: "asic::listing", "no matching files in {} for {}", literal, month);
                    }
                    for f in files {
                        if seen.insert(f.remote_path.clone()) { out.push(f); }
                    }
                }
            }
        }
        let out = if req.latest { keep_latest_versions(out, &cfg.extensions) } else { out };
        info!(target: "asic::listing", "{} files across {} months", out.len(), req.months.len());
        Ok(out)
    }

    fn files_in(&mut self, literal: &str, candidates: &[&KindEntry], cfg: &AsicConfig, month: YearMonth, extension: Option<&str>) -> AsicResult<Vec<AsicFile>> {
        let mut classified = Vec::new();
        for path in self.list_location(literal)? {
            if let Some(f) = classify(candidates, &cfg.extensions, path)? {
                classified.push(f);
            }
        }
        let classified = filter_by_month(classified, month);
        Ok(filter_by_extension(classified, extension))
    }
}

fn qualify(literal: &str, entry: &str) -> String {
    let e = normalize_remote_path(entry);
    if e.starts_with('/') { e } else { format!("{}/{}", literal.trim_end_matches('/'), e) }
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod listing_tests;
