use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::Value;

use super::helpers::{self, AdminClient};
use crate::output::{build_table, confirm, print_json, print_success, spinner, theme, OutputMode};

#[derive(Subcommand)]
pub enum RulesCmd {
    List(ListArgs),
    Get(GetArgs),
    Add(AddArgs),
    Delete(DeleteArgs),
}

#[derive(clap::Args)]
pub struct ListArgs {
    #[arg(long = "type", default_value = "all", help = "Rule type: all or flexible")]
    pub kind: String,
    #[arg(long, default_value = "", help = "Rule class")]
    pub class: String,
}

#[derive(clap::Args)]
pub struct GetArgs {
    #[arg(help = "Rule name")]
    pub name: String,
}

#[derive(clap::Args)]
pub struct AddArgs {
    #[arg(long, help = "JSON file path or inline JSON")]
    pub data: String,
    #[arg(long, help = "Name of a rule this one replaces")]
    pub replace: Option<String>,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    #[arg(help = "Rule name")]
    pub name: String,
    #[arg(long, help = "Skip confirmation prompt")]
    pub yes: bool,
}

pub async fn execute(cmd: RulesCmd, mode: OutputMode, endpoint: &str, agent: &str) -> Result<()> {
    if let RulesCmd::Delete(args) = &cmd {
        if mode == OutputMode::Human && !args.yes {
            let msg = format!("Delete rule '{}'?", args.name);
            if !confirm::confirm_action(&msg) {
                theme::print_dim("Cancelled.");
                return Ok(());
            }
        }
    }

    let client = AdminClient::connect(endpoint, agent).await?;
    match cmd {
        RulesCmd::List(args) => list(&client, args, mode).await,
        RulesCmd::Get(args) => get(&client, args, mode).await,
        RulesCmd::Add(args) => add(&client, args, mode).await,
        RulesCmd::Delete(args) => delete(&client, args, mode).await,
    }
}

async fn list(client: &AdminClient, args: ListArgs, mode: OutputMode) -> Result<()> {
    let sp = match mode {
        OutputMode::Human => Some(spinner::create("Fetching rules...")),
        OutputMode::Json => None,
    };
    let reply = client.request(&["LIST", &args.kind, &args.class]).await;
    if let Some(sp) = sp {
        spinner::finish_clear(&sp);
    }
    let rules = parse_list(&reply?)?;

    match mode {
        OutputMode::Json => print_json(&rules)?,
        OutputMode::Human => {
            if rules.is_empty() {
                print_success("No rules loaded");
                return Ok(());
            }
            theme::print_header("Flexible Alert Rules");
            let mut table = build_table(&["Name", "Description", "Metrics", "Assets"]);
            for r in &rules {
                table.add_row(vec![
                    r["name"].as_str().unwrap_or("-").to_string(),
                    r["description"].as_str().unwrap_or("").to_string(),
                    join(&r["metrics"]),
                    join(&r["assets"]),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

async fn get(client: &AdminClient, args: GetArgs, mode: OutputMode) -> Result<()> {
    let reply = client.request(&["GET", &args.name]).await?;
    let rule = parse_get(&reply)?;

    match mode {
        OutputMode::Json => print_json(&rule)?,
        OutputMode::Human => {
            theme::print_header(&format!("Rule {}", args.name));
            for (k, v) in rule.as_object().into_iter().flatten() {
                let shown = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                theme::print_kv(k, &shown);
            }
            println!();
        }
    }
    Ok(())
}

async fn add(client: &AdminClient, args: AddArgs, mode: OutputMode) -> Result<()> {
    let body = helpers::read_rule_data(&args.data)?;
    let mut request = vec!["ADD", body.as_str()];
    if let Some(old) = &args.replace {
        request.push(old);
    }

    let sp = match mode {
        OutputMode::Human => Some(spinner::create("Adding rule...")),
        OutputMode::Json => None,
    };
    let outcome = client.request(&request).await.and_then(|r| check_add(&r));
    match (&outcome, sp) {
        (Ok(()), Some(sp)) => spinner::finish_ok(&sp, "Rule added"),
        (Err(e), Some(sp)) => spinner::finish_err(&sp, &e.to_string()),
        _ => {}
    }
    outcome?;

    if mode == OutputMode::Json {
        print_json(&serde_json::json!({"added": true}))?;
    }
    Ok(())
}

async fn delete(client: &AdminClient, args: DeleteArgs, mode: OutputMode) -> Result<()> {
    let reply = client.request(&["DELETE", &args.name]).await?;
    check_delete(&reply, &args.name)?;

    match mode {
        OutputMode::Json => print_json(&serde_json::json!({"deleted": true, "name": args.name}))?,
        OutputMode::Human => print_success(&format!("Rule '{}' deleted", args.name)),
    }
    Ok(())
}

fn join(list: &Value) -> String {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn agent_error(reply: &[String]) -> Option<&str> {
    match reply {
        [status, reason, ..] if status == "ERROR" => Some(reason.as_str()),
        [status] if status == "ERROR" => Some("unknown error"),
        _ => None,
    }
}

/// `LIST type class {"flexible": rule}...`
pub(crate) fn parse_list(reply: &[String]) -> Result<Vec<Value>> {
    if let Some(reason) = agent_error(reply) {
        bail!("agent refused: {reason}");
    }
    if reply.first().map(String::as_str) != Some("LIST") || reply.len() < 3 {
        bail!("unexpected reply to LIST");
    }
    reply[3..]
        .iter()
        .map(|wrapped| -> Result<Value> {
            let mut doc: Value = serde_json::from_str(wrapped)?;
            if let Some(inner) = doc.get_mut("flexible") {
                return Ok(inner.take());
            }
            Ok(doc)
        })
        .collect()
}

pub(crate) fn parse_get(reply: &[String]) -> Result<Value> {
    match reply {
        [status, json, ..] if status == "OK" => Ok(serde_json::from_str(json)?),
        _ => match agent_error(reply) {
            Some(reason) => bail!("agent refused: {reason}"),
            None => bail!("unexpected reply to GET"),
        },
    }
}

pub(crate) fn check_add(reply: &[String]) -> Result<()> {
    match reply.first().map(String::as_str) {
        Some("OK") => Ok(()),
        _ => match agent_error(reply) {
            Some(reason) => bail!("agent refused: {reason}"),
            None => bail!("unexpected reply to ADD"),
        },
    }
}

/// `DELETE name OK` or `DELETE name ERROR reason`
pub(crate) fn check_delete(reply: &[String], name: &str) -> Result<()> {
    match reply {
        [verb, n, status] if verb == "DELETE" && n == name && status == "OK" => Ok(()),
        [verb, n, rest @ ..] if verb == "DELETE" && n == name => match agent_error(rest) {
            Some(reason) => bail!("agent refused: {reason}"),
            None => bail!("unexpected reply to DELETE"),
        },
        _ => bail!("unexpected reply to DELETE"),
    }
}
