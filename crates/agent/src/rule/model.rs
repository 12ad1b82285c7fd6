use std::collections::BTreeMap;

use flexalert_common::Action;

use crate::evaluator::ProgramSlot;

pub const RESULT_LOW_CRITICAL: &str = "low_critical";
pub const RESULT_LOW_WARNING: &str = "low_warning";
pub const RESULT_OK: &str = "ok";
pub const RESULT_HIGH_WARNING: &str = "high_warning";
pub const RESULT_HIGH_CRITICAL: &str = "high_critical";

/// A named matching predicate with an evaluation program and its action
/// table. The compiled program is owned by the rule and dropped with it.
#[derive(Debug, Default)]
pub struct Rule {
    pub name: String,
    pub description: String,
    pub logical_asset: String,
    pub metrics: Vec<String>,
    pub assets: Vec<String>,
    pub groups: Vec<String>,
    pub models: Vec<String>,
    pub types: Vec<String>,
    pub results: BTreeMap<String, Vec<Action>>,
    pub variables: BTreeMap<String, String>,
    pub evaluation: String,
    pub(crate) program: ProgramSlot,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_result_action(&mut self, result: &str, action: Action) {
        self.results
            .entry(result.to_string())
            .or_default()
            .push(action);
    }

    /// Actions configured for an evaluation code. Codes outside -2..=2 have
    /// none.
    pub fn result_actions(&self, code: i32) -> &[Action] {
        self.results
            .get(result_key(code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_asset(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metrics.iter().any(|m| m == metric)
    }

    pub fn is_sensor_port_rule(&self) -> bool {
        self.name.contains("sensorgpio")
    }

    /// Gives `new` a copy of the action table of `old`.
    pub fn merge(old: &Rule, new: &mut Rule) {
        new.results = old.results.clone();
    }
}

pub fn result_key(code: i32) -> &'static str {
    match code {
        -2 => RESULT_LOW_CRITICAL,
        -1 => RESULT_LOW_WARNING,
        0 => RESULT_OK,
        1 => RESULT_HIGH_WARNING,
        2 => RESULT_HIGH_CRITICAL,
        _ => "",
    }
}
