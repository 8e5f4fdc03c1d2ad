// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use joiner_app::{NODE_TYPE, NodeId, Size, TriggerKind};
use joiner_tui::{InternalEvent, SavedNode};
use joiner_wildcards::CandidateFetcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

const WORKFLOW_VERSION: u32 = 1;

pub type SharedFetcher = Arc<dyn CandidateFetcher + Send + Sync>;

#[derive(Debug, Serialize, Deserialize)]
struct WorkflowFile {
    version: u32,
    #[serde(default)]
    nodes: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JoinerEntry {
    id: u64,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    size: [u32; 2],
    #[serde(default)]
    widgets_values: Vec<Value>,
}

impl JoinerEntry {
    fn from_saved(node: &SavedNode) -> Self {
        Self {
            id: node.id.get(),
            node_type: NODE_TYPE.to_owned(),
            size: [node.size.width, node.size.height],
            widgets_values: node.widgets_values.clone(),
        }
    }

    fn into_saved(self) -> SavedNode {
        SavedNode {
            id: NodeId::new(self.id),
            size: Size::new(self.size[0], self.size[1]),
            widgets_values: self.widgets_values,
        }
    }
}

/// A node of another type, kept verbatim at its index in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignNode {
    pub index: usize,
    pub value: Value,
}

/// Workflow file plus candidate fetching. Nodes of other types are kept
/// verbatim and written back on save.
pub struct FileRuntime {
    path: PathBuf,
    fetcher: Option<SharedFetcher>,
    foreign: Vec<ForeignNode>,
}

impl FileRuntime {
    pub fn new(path: impl Into<PathBuf>, fetcher: Option<SharedFetcher>) -> Self {
        Self {
            path: path.into(),
            fetcher,
            foreign: Vec::new(),
        }
    }
}

impl joiner_tui::AppRuntime for FileRuntime {
    fn load_workflow(&mut self) -> Result<Vec<SavedNode>> {
        let (nodes, foreign) = read_workflow(&self.path)?;
        self.foreign = foreign;
        Ok(nodes)
    }

    fn save_workflow(&mut self, nodes: &[SavedNode]) -> Result<()> {
        write_workflow(&self.path, nodes, &self.foreign)
    }

    fn fetch_candidates(&mut self, kind: TriggerKind) -> Result<Vec<String>> {
        match &self.fetcher {
            Some(fetcher) => fetcher.fetch(kind),
            None => Ok(Vec::new()),
        }
    }

    fn spawn_candidate_fetch(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let Some(fetcher) = self.fetcher.clone() else {
            return Ok(());
        };
        log::info!("fetching candidates from {}", fetcher.describe());
        thread::Builder::new()
            .name("candidate-fetch".to_owned())
            .spawn(move || {
                for kind in TriggerKind::ALL {
                    let result = fetcher.fetch(kind).map_err(|error| format!("{error:#}"));
                    if tx.send(InternalEvent::Candidates { kind, result }).is_err() {
                        return;
                    }
                }
            })
            .context("spawn candidate fetch thread")?;
        Ok(())
    }
}

/// Reads the `TextJoiner` nodes of a workflow file. A missing file is an
/// empty workflow.
pub fn read_workflow(path: &Path) -> Result<(Vec<SavedNode>, Vec<ForeignNode>)> {
    if !path.exists() {
        return Ok((Vec::new(), Vec::new()));
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("read workflow {}", path.display()))?;
    let file: WorkflowFile = serde_json::from_str(&raw)
        .with_context(|| format!("parse workflow JSON {}", path.display()))?;
    if file.version != WORKFLOW_VERSION {
        bail!(
            "unsupported workflow version {} in {}; expected {}",
            file.version,
            path.display(),
            WORKFLOW_VERSION
        );
    }

    let mut nodes = Vec::new();
    let mut foreign = Vec::new();
    for (index, entry) in file.nodes.into_iter().enumerate() {
        if entry.get("type").and_then(Value::as_str) != Some(NODE_TYPE) {
            foreign.push(ForeignNode {
                index,
                value: entry,
            });
            continue;
        }
        let parsed: JoinerEntry = serde_json::from_value(entry).with_context(|| {
            format!("decode node {index} in workflow {}", path.display())
        })?;
        nodes.push(parsed.into_saved());
    }
    log::debug!(
        "read {} {NODE_TYPE} node(s) and {} other node(s) from {}",
        nodes.len(),
        foreign.len(),
        path.display()
    );
    Ok((nodes, foreign))
}

/// Writes through a sibling temp file and renames it into place. Foreign
/// nodes go back to their original index; `TextJoiner` nodes fill the
/// remaining positions in order.
pub fn write_workflow(
    path: &Path,
    nodes: &[SavedNode],
    foreign: &[ForeignNode],
) -> Result<()> {
    let mut entries = nodes
        .iter()
        .map(|node| {
            serde_json::to_value(JoinerEntry::from_saved(node))
                .with_context(|| format!("encode node {}", node.id.get()))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut foreign = foreign.to_vec();
    foreign.sort_by_key(|node| node.index);
    for node in foreign {
        let index = node.index.min(entries.len());
        entries.insert(index, node.value);
    }
    let file = WorkflowFile {
        version: WORKFLOW_VERSION,
        nodes: entries,
    };
    let body = serde_json::to_string_pretty(&file).context("encode workflow")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create workflow directory {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("workflow path {} has no file name", path.display()))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, body)
        .with_context(|| format!("write workflow temp file {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("replace workflow {}", path.display()))?;
    log::info!("saved {} node(s) to {}", nodes.len(), path.display());
    Ok(())
}
