use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::codec;
use super::error::RuleError;
use super::model::Rule;

pub const RULE_EXTENSION: &str = "rule";

/// Rules indexed by name.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a rule, returning the one it replaced.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.name.clone(), rule)
    }

    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        self.rules.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Loads every `*.rule` file directly inside `dir`. Files that fail to
    /// parse are logged and skipped. Returns the number of rules loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RuleError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == RULE_EXTENSION))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match codec::load_from_path(&path) {
                Ok(rule) => {
                    tracing::debug!(rule = %rule.name, path = %path.display(), "rule loaded");
                    self.insert(rule);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping rule file");
                }
            }
        }
        Ok(loaded)
    }
}

/// File backing rule `name` inside `dir`. `None` when the name could point
/// outside `dir`.
pub fn rule_path(dir: &Path, name: &str) -> Option<PathBuf> {
    if !is_valid_rule_name(name) {
        return None;
    }
    Some(dir.join(format!("{name}.{RULE_EXTENSION}")))
}

/// Whether `name` can be used as a rule file stem.
pub fn is_valid_rule_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
