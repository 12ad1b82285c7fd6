//! Agent state and the handlers that mutate it. Everything here is driven by
//! the dispatch loop one event at a time; handlers return what should be sent
//! instead of touching the bus themselves.

mod admin;
mod assets;
mod metrics;

use std::path::{Path, PathBuf};

use flexalert_common::subjects::AUTOCONFIG_SENDER;

use crate::alert::Alert;
use crate::cache::{AssetIndex, MetricCache};
use crate::rule::{self, RuleSet};
use crate::script::ScriptEngine;

pub use admin::{
    ALREADY_EXISTS, CAN_NOT_REMOVE, DOES_NOT_EXISTS, INVALID_JSON, INVALID_TYPE, NOT_FOUND,
    SAVE_FAILURE,
};

/// Something the engine wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Publish on the producer stream.
    Alert(Alert),
    /// Ask the asset directory to re-announce an asset.
    Republish { asset: String },
}

pub struct FlexibleAlert {
    rules: RuleSet,
    assets: AssetIndex,
    metrics: MetricCache,
    script: Box<dyn ScriptEngine>,
    rules_dir: Option<PathBuf>,
    autoconfig_sender: String,
    verbose: bool,
}

impl FlexibleAlert {
    pub fn new(script: Box<dyn ScriptEngine>) -> Self {
        Self {
            rules: RuleSet::new(),
            assets: AssetIndex::new(),
            metrics: MetricCache::new(),
            script,
            rules_dir: None,
            autoconfig_sender: AUTOCONFIG_SENDER.to_string(),
            verbose: false,
        }
    }

    pub fn with_autoconfig_sender(mut self, sender: impl Into<String>) -> Self {
        self.autoconfig_sender = sender.into();
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Loads every rule file in `dir` and makes it the target directory for
    /// ADD and DELETE. Previously loaded rules are kept.
    pub fn load_rules(&mut self, dir: &Path) {
        self.rules_dir = Some(dir.to_path_buf());
        match self.rules.load_dir(dir) {
            Ok(n) => tracing::info!(dir = %dir.display(), loaded = n, total = self.rules.len(), "rules loaded"),
            Err(e) => tracing::error!(dir = %dir.display(), error = %e, "cannot open rule dir"),
        }
    }

    fn load_one_rule(&mut self, path: &Path) {
        match rule::load_from_path(path) {
            Ok(rule) => {
                tracing::debug!(rule = %rule.name, path = %path.display(), "rule loaded");
                self.rules.insert(rule);
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to load rule"),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn assets(&self) -> &AssetIndex {
        &self.assets
    }

    pub fn metrics(&self) -> &MetricCache {
        &self.metrics
    }

    pub fn rules_dir(&self) -> Option<&Path> {
        self.rules_dir.as_deref()
    }
}
