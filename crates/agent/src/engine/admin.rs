use flexalert_common::frames::frames;

use super::FlexibleAlert;
use crate::rule::{self, is_valid_rule_name, rule_path, Rule};

pub const INVALID_TYPE: &str = "INVALID_TYPE";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const INVALID_JSON: &str = "INVALID_JSON";
pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
pub const SAVE_FAILURE: &str = "SAVE_FAILURE";
pub const CAN_NOT_REMOVE: &str = "CAN_NOT_REMOVE";
pub const DOES_NOT_EXISTS: &str = "DOES_NOT_EXISTS";

impl FlexibleAlert {
    /// Answers an administrative request. Requests with an unknown command or
    /// missing mandatory fields get no reply at all.
    ///
    /// ```text
    /// LIST type class       -> LIST type class {"flexible": rule}...  | ERROR INVALID_TYPE
    /// GET name              -> OK rule                                | ERROR NOT_FOUND
    /// ADD json [old_name]   -> OK json                                | ERROR reason
    /// DELETE name           -> DELETE name OK                         | DELETE name ERROR reason
    /// ```
    pub fn handle_admin(&mut self, sender: &str, request: &[String]) -> Option<Vec<String>> {
        let (command, args) = request.split_first()?;
        let first = args.first().map(String::as_str);
        let second = args.get(1).map(String::as_str);

        match command.as_str() {
            "LIST" => Some(self.list_rules(first?, second.unwrap_or_default())),
            "GET" => Some(self.get_rule(first?)),
            "ADD" => {
                let incomplete = sender == self.autoconfig_sender;
                Some(self.add_rule(first?, second, incomplete))
            }
            "DELETE" => Some(self.delete_rule(first?)),
            other => {
                tracing::debug!(command = other, sender, "unknown admin command");
                None
            }
        }
    }

    fn list_rules(&self, kind: &str, class: &str) -> Vec<String> {
        if kind != "all" && kind != "flexible" {
            return frames(&["ERROR", INVALID_TYPE]);
        }
        let mut reply = frames(&["LIST", kind, class]);
        reply.extend(
            self.rules
                .iter()
                .map(|r| format!("{{\"flexible\": {} }}", rule::to_json(r))),
        );
        reply
    }

    fn get_rule(&self, name: &str) -> Vec<String> {
        match self.rules.get(name) {
            Some(r) => vec!["OK".to_string(), rule::to_json(r)],
            None => frames(&["ERROR", NOT_FOUND]),
        }
    }

    fn add_rule(&mut self, json: &str, old_name: Option<&str>, incomplete: bool) -> Vec<String> {
        let mut new_rule = match rule::parse(json) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting rule");
                return frames(&["ERROR", INVALID_JSON]);
            }
        };

        if !is_valid_rule_name(&new_rule.name) {
            tracing::warn!(rule = %new_rule.name, "rule name is not a valid file name");
            return frames(&["ERROR", INVALID_JSON]);
        }

        if incomplete {
            if let Some(old) = self
                .rules
                .get(&new_rule.name)
                .filter(|r| r.is_sensor_port_rule())
            {
                tracing::info!(rule = %new_rule.name, "merging incomplete rule");
                Rule::merge(old, &mut new_rule);
            }
        }

        if let Some(old_name) = old_name {
            tracing::info!(rule = old_name, "deleting replaced rule");
            let _ = self.delete_rule(old_name);
        }

        if self
            .rules
            .get(&new_rule.name)
            .is_some_and(|r| !r.is_sensor_port_rule())
        {
            tracing::error!(rule = %new_rule.name, "rule exists");
            return frames(&["ERROR", ALREADY_EXISTS]);
        }

        let Some(path) = self.rules_dir.as_deref().and_then(|dir| rule_path(dir, &new_rule.name)) else {
            tracing::error!(rule = %new_rule.name, "no rule directory loaded, cannot save");
            return frames(&["ERROR", SAVE_FAILURE]);
        };
        if let Err(e) = rule::save_to_path(&new_rule, &path) {
            tracing::error!(path = %path.display(), error = %e, "error while saving rule");
            return frames(&["ERROR", SAVE_FAILURE]);
        }

        tracing::info!(path = %path.display(), "loading rule");
        self.load_one_rule(&path);
        vec!["OK".to_string(), json.to_string()]
    }

    fn delete_rule(&mut self, name: &str) -> Vec<String> {
        let mut reply = frames(&["DELETE", name]);
        if !self.rules.contains(name) {
            reply.extend(frames(&["ERROR", DOES_NOT_EXISTS]));
            return reply;
        }

        let removed = match self.rules_dir.as_deref().map(|dir| rule_path(dir, name)) {
            Some(Some(path)) => match std::fs::remove_file(&path) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "can't remove rule file");
                    false
                }
            },
            Some(None) => {
                tracing::warn!(rule = name, "rule name is not a valid file name");
                false
            }
            None => {
                tracing::error!(rule = name, "no rule directory loaded, cannot remove");
                false
            }
        };

        if removed {
            self.rules.remove(name);
            reply.push("OK".to_string());
        } else {
            reply.extend(frames(&["ERROR", CAN_NOT_REMOVE]));
        }
        reply
    }
}
