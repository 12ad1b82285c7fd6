use flexalert_common::event::{AssetEvent, ASSET_EXT_NAME};

use super::FlexibleAlert;
use crate::matcher;

impl FlexibleAlert {
    pub fn handle_asset(&mut self, asset: &AssetEvent) {
        match asset.operation.as_str() {
            "delete" => {
                self.assets.clear_asset(&asset.name);
                self.assets.clear_display_name(&asset.name);
            }
            "update" | "inventory" => self.index_asset(asset),
            other => tracing::debug!(asset = %asset.name, operation = other, "asset operation ignored"),
        }
    }

    fn index_asset(&mut self, asset: &AssetEvent) {
        let applicable: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| matcher::matches(rule, asset))
            .map(|rule| rule.name.clone())
            .collect();

        if applicable.is_empty() {
            tracing::debug!(asset = %asset.name, "no rule for asset");
            self.assets.clear_asset(&asset.name);
            return;
        }

        tracing::debug!(asset = %asset.name, rules = ?applicable, "rules valid for asset");
        self.assets.set_applicable_rules(&asset.name, applicable);
        if let Some(ename) = asset.ext_str(ASSET_EXT_NAME) {
            self.assets.set_display_name(&asset.name, ename);
        }
    }
}
