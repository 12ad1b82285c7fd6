use flexalert_common::event::{
    AssetEvent, ASSET_AUX_SUBTYPE, ASSET_AUX_TYPE, ASSET_EXT_DEVICE_PART, ASSET_EXT_MODEL,
};

use crate::rule::Rule;

pub const SENSOR_GPIO_SUBTYPE: &str = "sensorgpio";

/// Decides whether a rule applies to an asset.
///
/// GPIO sensors are matched strictly: the asset must be listed by name and
/// its model must be listed too. Anything else matches on the first hit of
/// name, group, model or device part, then type or subtype.
pub fn matches(rule: &Rule, asset: &AssetEvent) -> bool {
    let model = asset.ext_str(ASSET_EXT_MODEL).unwrap_or_default();

    if asset.aux_str(ASSET_AUX_SUBTYPE) == Some(SENSOR_GPIO_SUBTYPE) {
        return rule.has_asset(&asset.name) && rule.has_model(model);
    }

    if rule.has_asset(&asset.name) {
        return true;
    }
    if asset.groups().any(|g| rule.has_group(g)) {
        return true;
    }
    if rule.has_model(model)
        || rule.has_model(asset.ext_str(ASSET_EXT_DEVICE_PART).unwrap_or_default())
    {
        return true;
    }
    rule.has_type(asset.aux_str(ASSET_AUX_TYPE).unwrap_or_default())
        || rule.has_type(asset.aux_str(ASSET_AUX_SUBTYPE).unwrap_or_default())
}
