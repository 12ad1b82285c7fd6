use std::collections::HashMap;

/// Which rules apply to which asset, and the human-friendly asset names.
#[derive(Debug, Default)]
pub struct AssetIndex {
    rules: HashMap<String, Vec<String>>,
    display_names: HashMap<String, String>,
}

impl AssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applicable_rules(&self, asset: &str) -> Option<&[String]> {
        self.rules.get(asset).map(Vec::as_slice)
    }

    /// Setting an empty list clears the entry.
    pub fn set_applicable_rules(&mut self, asset: &str, rules: Vec<String>) {
        if rules.is_empty() {
            self.rules.remove(asset);
        } else {
            self.rules.insert(asset.to_string(), rules);
        }
    }

    pub fn clear_asset(&mut self, asset: &str) {
        self.rules.remove(asset);
    }

    pub fn is_known(&self, asset: &str) -> bool {
        self.rules.contains_key(asset)
    }

    pub fn display_name(&self, asset: &str) -> Option<&str> {
        self.display_names.get(asset).map(String::as_str)
    }

    pub fn set_display_name(&mut self, asset: &str, name: &str) {
        self.display_names.insert(asset.to_string(), name.to_string());
    }

    pub fn clear_display_name(&mut self, asset: &str) {
        self.display_names.remove(asset);
    }
}
