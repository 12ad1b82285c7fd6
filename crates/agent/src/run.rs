use std::error::Error;

use flexalert_common::frames::frames;
use flexalert_common::subjects::{STREAM_ALERTS_SYS, STREAM_ASSETS, STREAM_METRICS, STREAM_METRICS_SENSOR};

use crate::actor::Actor;
use crate::bus::NatsBus;
use crate::config::AgentConfig;
use crate::engine::FlexibleAlert;
use crate::logging::LevelHandle;
use crate::script::LuaEngine;

pub async fn run(config: AgentConfig, log: Option<LevelHandle>) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing::info!(
        endpoint = %config.bus.endpoint,
        name = %config.bus.name,
        rules_dir = %config.server.rules_dir,
        "agent configured"
    );

    let engine = FlexibleAlert::new(Box::new(LuaEngine))
        .with_autoconfig_sender(config.bus.autoconfig_sender.clone());
    let (actor, handle) = Actor::new(engine, NatsBus::new());
    let actor = match log {
        Some(h) => actor.with_log_handle(h),
        None => actor,
    };

    for command in startup_commands(&config) {
        handle.send(command).await?;
    }

    actor.run_until(crate::shutdown::wait_for_shutdown()).await;
    tracing::info!("agent stopped");
    Ok(())
}

/// Control commands that bring a fresh actor online.
pub fn startup_commands(config: &AgentConfig) -> Vec<Vec<String>> {
    let bus = &config.bus;
    let mut commands = vec![
        frames(&["BIND", bus.endpoint.as_str(), bus.name.as_str()]),
        frames(&["PRODUCER", STREAM_ALERTS_SYS]),
        frames(&["CONSUMER", STREAM_METRICS, bus.metrics_pattern.as_str()]),
        frames(&["CONSUMER", STREAM_METRICS_SENSOR, bus.sensor_pattern.as_str()]),
        frames(&["CONSUMER", STREAM_ASSETS, bus.assets_pattern.as_str()]),
        frames(&["LOADRULES", config.server.rules_dir.as_str()]),
    ];
    if config.server.verbose {
        commands.push(frames(&["VERBOSE"]));
    }
    commands
}
