mod codec;
mod error;
mod json_walk;
mod model;
mod store;

pub use codec::{encode_string, load_from_path, parse, save_to_path, to_json};
pub use error::RuleError;
pub use model::{result_key, Rule};
pub use store::{is_valid_rule_name, rule_path, RuleSet, RULE_EXTENSION};
