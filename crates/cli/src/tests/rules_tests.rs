use crate::cmd::helpers::read_rule_data;
use crate::cmd::rules::{check_add, check_delete, parse_get, parse_list};

fn reply(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn list_unwraps_flexible_envelope() {
    let r = reply(&[
        "LIST",
        "all",
        "",
        "{\"flexible\": {\"name\":\"load\",\"metrics\":[\"status.ups\"]} }",
        "{\"name\":\"bare\"}",
    ]);
    let rules = parse_list(&r).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["name"], "load");
    assert_eq!(rules[0]["metrics"][0], "status.ups");
    assert_eq!(rules[1]["name"], "bare");
}

#[test]
fn list_error_surfaces_reason() {
    let err = parse_list(&reply(&["ERROR", "INVALID_TYPE"])).unwrap_err();
    assert!(err.to_string().contains("INVALID_TYPE"));
}

#[test]
fn list_empty() {
    assert!(parse_list(&reply(&["LIST", "all", "x"])).unwrap().is_empty());
}

#[test]
fn get_ok_and_not_found() {
    let rule = parse_get(&reply(&["OK", "{\n\"name\":\"load\"\n}"])).unwrap();
    assert_eq!(rule["name"], "load");
    let err = parse_get(&reply(&["ERROR", "NOT_FOUND"])).unwrap_err();
    assert!(err.to_string().contains("NOT_FOUND"));
}

#[test]
fn add_outcomes() {
    assert!(check_add(&reply(&["OK", "{}"])).is_ok());
    let err = check_add(&reply(&["ERROR", "ALREADY_EXISTS"])).unwrap_err();
    assert!(err.to_string().contains("ALREADY_EXISTS"));
    assert!(check_add(&reply(&[])).is_err());
}

#[test]
fn delete_outcomes() {
    assert!(check_delete(&reply(&["DELETE", "load", "OK"]), "load").is_ok());
    let err = check_delete(&reply(&["DELETE", "load", "ERROR", "DOES_NOT_EXISTS"]), "load").unwrap_err();
    assert!(err.to_string().contains("DOES_NOT_EXISTS"));
    assert!(check_delete(&reply(&["DELETE", "other", "OK"]), "load").is_err());
}

#[test]
fn rule_data_from_file_or_inline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rule.json");
    std::fs::write(&path, r#"{"name":"from-file"}"#).unwrap();

    let text = read_rule_data(path.to_str().unwrap()).unwrap();
    assert!(text.contains("from-file"));
    assert_eq!(read_rule_data(r#"{"name":"inline"}"#).unwrap(), r#"{"name":"inline"}"#);
    assert!(read_rule_data("{not json").is_err());
}
