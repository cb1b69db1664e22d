// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::PipelineConfig;
use crate::errors::{Result, WinchmanError};

/// Run semantic validation against a parsed configuration.
///
/// This checks:
/// - every block has a non-empty name and a dockerfile
/// - block names are unique
/// - all `requires` entries refer to existing blocks (and not the block
///   itself)
/// - the dependency graph has no cycles
///
/// An empty `blocks` list is *not* rejected here; the pipeline entry point
/// reports that case when the initial runnable set turns out empty.
pub fn validate_config(cfg: &PipelineConfig) -> Result<()> {
    validate_block_names(cfg)?;
    validate_requires(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_block_names(cfg: &PipelineConfig) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for block in &cfg.blocks {
        if block.name.is_empty() {
            return Err(WinchmanError::Config(
                "block with empty name".to_string(),
            ));
        }
        if block.dockerfile.is_empty() {
            return Err(WinchmanError::Config(format!(
                "block '{}' is missing a dockerfile",
                block.name
            )));
        }
        if !seen.insert(block.name.as_str()) {
            return Err(WinchmanError::Config(format!(
                "duplicate block name '{}'",
                block.name
            )));
        }
    }

    Ok(())
}

fn validate_requires(cfg: &PipelineConfig) -> Result<()> {
    let names: HashSet<&str> = cfg.blocks.iter().map(|b| b.name.as_str()).collect();

    for block in &cfg.blocks {
        for dep in &block.requires {
            if dep == &block.name {
                return Err(WinchmanError::Config(format!(
                    "block '{}' cannot require itself",
                    block.name
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(WinchmanError::Config(format!(
                    "block '{}' requires unknown block '{}'",
                    block.name, dep
                )));
            }
        }
    }

    Ok(())
}

fn validate_dag(cfg: &PipelineConfig) -> Result<()> {
    // Edge direction: dep -> block.
    // For:
    //   - name: B
    //     requires: [A]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for block in &cfg.blocks {
        graph.add_node(block.name.as_str());
    }

    for block in &cfg.blocks {
        for dep in &block.requires {
            graph.add_edge(dep.as_str(), block.name.as_str(), ());
        }
    }

    // A topological sort fails iff there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(WinchmanError::Config(format!(
            "cycle detected in block graph involving block '{}'",
            cycle.node_id()
        ))),
    }
}
