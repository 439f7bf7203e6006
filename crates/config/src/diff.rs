// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-set computation between two resolved configs.

use crate::loader::ResolvedConfig;
use drover_core::{ChangeKind, ConfigChange};

/// Compute the reload change set.
///
/// Agents are compared by name; modification means deep inequality of the
/// resolved definition. Schedule-level entries are reported for agents
/// present in both configs, named `"<agent>/<schedule>"`.
pub fn diff_configs(old: &ResolvedConfig, new: &ResolvedConfig) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    for agent in &new.agents {
        match old.agent(&agent.name) {
            None => changes.push(ConfigChange::agent(ChangeKind::Added, &agent.name)),
            Some(prev) if prev != agent => {
                changes.push(ConfigChange::agent(ChangeKind::Modified, &agent.name));
            }
            Some(_) => {}
        }
    }

    for agent in &old.agents {
        if new.agent(&agent.name).is_none() {
            changes.push(ConfigChange::agent(ChangeKind::Removed, &agent.name));
        }
    }

    // Schedule-level detail for agents that exist on both sides
    for agent in &new.agents {
        let Some(prev) = old.agent(&agent.name) else {
            continue;
        };

        for (name, sched) in &agent.schedules {
            match prev.schedules.get(name) {
                None => changes.push(ConfigChange::schedule(
                    ChangeKind::Added,
                    &agent.name,
                    name,
                )),
                Some(old_sched) if old_sched != sched => changes.push(
                    ConfigChange::schedule(ChangeKind::Modified, &agent.name, name),
                ),
                Some(_) => {}
            }
        }

        for name in prev.schedules.keys() {
            if !agent.schedules.contains_key(name) {
                changes.push(ConfigChange::schedule(
                    ChangeKind::Removed,
                    &agent.name,
                    name,
                ));
            }
        }
    }

    changes
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
