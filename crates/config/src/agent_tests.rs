// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn minimal_agent_file_gets_defaults() {
    let agent: AgentFile = serde_yaml::from_str("name: reviewer\n").unwrap();
    assert_eq!(agent.name, "reviewer");
    assert_eq!(agent.model, "default");
    assert_eq!(agent.max_concurrent, 1);
    assert_eq!(agent.runtime, "sdk");
    assert!(agent.working_dir.is_none());
    assert!(agent.schedules.is_empty());
    assert!(agent.chat.is_none());
}

#[test]
fn working_dir_accepts_string_or_object() {
    let agent: AgentFile =
        serde_yaml::from_str("name: a\nworking_dir: /srv/work\n").unwrap();
    assert_eq!(agent.working_dir.unwrap().root(), "/srv/work");

    let agent: AgentFile =
        serde_yaml::from_str("name: a\nworking_dir:\n  root: /srv/other\n").unwrap();
    assert_eq!(agent.working_dir.unwrap().root(), "/srv/other");
}

#[test]
fn schedules_keep_declaration_order() {
    let yaml = r#"
name: a
schedules:
  hourly:
    interval: 1h
  daily:
    interval: 1d
  cleanup:
    interval: 30m
"#;
    let agent: AgentFile = serde_yaml::from_str(yaml).unwrap();
    let names: Vec<&String> = agent.schedules.keys().collect();
    assert_eq!(names, ["hourly", "daily", "cleanup"]);
}

#[test]
fn schedule_defaults() {
    let yaml = "name: a\nschedules:\n  tick:\n    interval: 5m\n";
    let agent: AgentFile = serde_yaml::from_str(yaml).unwrap();
    let sched = &agent.schedules["tick"];
    assert_eq!(sched.schedule_type, "interval");
    assert!(sched.enabled);
    assert!(sched.prompt.is_none());
}

#[test]
fn schedule_can_be_disabled_with_prompt() {
    let yaml = r#"
name: a
schedules:
  hourly:
    type: interval
    interval: 1h
    prompt: Check hourly tasks
    enabled: false
"#;
    let agent: AgentFile = serde_yaml::from_str(yaml).unwrap();
    let sched = &agent.schedules["hourly"];
    assert!(!sched.enabled);
    assert_eq!(sched.prompt.as_deref(), Some("Check hourly tasks"));
}

#[test]
fn discord_binding_defaults() {
    let yaml = r#"
name: a
chat:
  discord:
    bot_token_env: DISCORD_TOKEN_A
"#;
    let agent: AgentFile = serde_yaml::from_str(yaml).unwrap();
    let discord = agent.chat.unwrap().discord.unwrap();
    assert_eq!(discord.bot_token_env, "DISCORD_TOKEN_A");
    assert_eq!(discord.session_expiry_hours, 24);
    assert!(discord.output.tool_results);
    assert!(!discord.output.system_status);
    assert_eq!(discord.output.max_output_chars, 900);
}

#[test]
fn slack_binding_parses_channels() {
    let yaml = r#"
name: a
chat:
  slack:
    bot_token_env: SLACK_BOT_TOKEN
    app_token_env: SLACK_APP_TOKEN
    channels: [C111, C222]
"#;
    let agent: AgentFile = serde_yaml::from_str(yaml).unwrap();
    let slack = agent.chat.unwrap().slack.unwrap();
    assert_eq!(slack.channels, ["C111", "C222"]);
}
