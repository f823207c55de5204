// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{BatchConfig, RawBatchConfig};
use crate::errors::{RepobatchError, Result};

impl TryFrom<RawBatchConfig> for BatchConfig {
    type Error = RepobatchError;

    fn try_from(raw: RawBatchConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(BatchConfig::new_unchecked(raw.config, raw.repo, raw.group))
    }
}

fn validate_raw_config(cfg: &RawBatchConfig) -> Result<()> {
    ensure_has_groups(cfg)?;
    validate_global_config(cfg)?;
    validate_groups(cfg)?;
    validate_group_dependencies(cfg)?;
    validate_no_cycles(cfg)?;
    Ok(())
}

fn ensure_has_groups(cfg: &RawBatchConfig) -> Result<()> {
    if cfg.group.is_empty() {
        return Err(RepobatchError::ConfigError(
            "config must contain at least one [group.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawBatchConfig) -> Result<()> {
    if cfg.config.git.as_os_str().is_empty() {
        return Err(RepobatchError::ConfigError(
            "[config].git must not be empty".to_string(),
        ));
    }

    if cfg.config.poll_interval_ms == 0 {
        return Err(RepobatchError::ConfigError(
            "[config].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_groups(cfg: &RawBatchConfig) -> Result<()> {
    for (name, group) in cfg.group.iter() {
        if !cfg.repo.contains_key(&group.repo) {
            return Err(RepobatchError::ConfigError(format!(
                "group '{}' refers to unknown repo '{}'",
                name, group.repo
            )));
        }

        if group.task.is_empty() {
            return Err(RepobatchError::ConfigError(format!(
                "group '{}' must contain at least one [[group.{}.task]] entry",
                name, name
            )));
        }

        if let Some(pos) = group.task.iter().position(|t| t.args.is_empty()) {
            return Err(RepobatchError::ConfigError(format!(
                "task #{} of group '{}' has no git arguments",
                pos + 1,
                name
            )));
        }
    }
    Ok(())
}

fn validate_group_dependencies(cfg: &RawBatchConfig) -> Result<()> {
    for (name, group) in cfg.group.iter() {
        if group.after.is_some() && group.after_started.is_some() {
            return Err(RepobatchError::ConfigError(format!(
                "group '{}' sets both `after` and `after_started`; only one precondition is allowed",
                name
            )));
        }

        let Some(dep) = group.dependency() else {
            continue;
        };

        if dep == name {
            return Err(RepobatchError::ConfigError(format!(
                "group '{}' cannot depend on itself",
                name
            )));
        }
        if !cfg.group.contains_key(dep) {
            return Err(RepobatchError::ConfigError(format!(
                "group '{}' has unknown dependency '{}'",
                name, dep
            )));
        }
    }
    Ok(())
}

fn validate_no_cycles(cfg: &RawBatchConfig) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.group.keys() {
        graph.add_node(name.as_str());
    }

    for (name, group) in cfg.group.iter() {
        if let Some(dep) = group.dependency() {
            graph.add_edge(dep, name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(RepobatchError::DependencyCycle(format!(
            "cycle detected between task groups involving '{}'",
            cycle.node_id()
        ))),
    }
}
