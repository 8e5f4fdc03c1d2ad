// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use joiner_app::{
    ElementId, NodeHost, NodeId, PayloadSnapshot, Size, TextInputConfig, WidgetValue,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

const SUBJECTS: [&str; 10] = [
    "a lighthouse",
    "an old fox",
    "a glass teapot",
    "a paper boat",
    "a sleeping cat",
    "a copper robot",
    "a lone pine",
    "a red umbrella",
    "a stone bridge",
    "a hot air balloon",
];

const STYLES: [&str; 8] = [
    "watercolor",
    "ink sketch",
    "oil painting",
    "pixel art",
    "studio photo",
    "charcoal",
    "isometric render",
    "linocut",
];

const MOODS: [&str; 8] = [
    "at dusk",
    "in heavy fog",
    "under neon light",
    "on a snowy morning",
    "in golden hour",
    "after rain",
    "by candlelight",
    "at high noon",
];

const WILDCARD_NAMES: [&str; 6] = ["colors", "season", "artists", "lighting", "camera", "mood"];

const PRESETS: [&str; 4] = [
    "/* size: 896x1152 */",
    "/* size: 1024x1024 */",
    "/* steps: 30 */",
    "/* style: cinematic */",
];

/// Everything a node asked of its host, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Create { name: String, element: ElementId },
    Detach(ElementId),
    Resize(Size),
    Redraw,
    DeferredReorder(Duration),
    Rejection(String),
}

/// Host double that hands out element ids and records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    next_element: u64,
    calls: Vec<(NodeId, HostCall)>,
    attach_later: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that attaches elements asynchronously: creation returns `None`.
    pub fn deferred_attach() -> Self {
        Self {
            attach_later: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[(NodeId, HostCall)] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn created(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|(_, call)| match call {
                HostCall::Create { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn detached(&self) -> Vec<ElementId> {
        self.calls
            .iter()
            .filter_map(|(_, call)| match call {
                HostCall::Detach(element) => Some(*element),
                _ => None,
            })
            .collect()
    }

    pub fn rejections(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|(_, call)| match call {
                HostCall::Rejection(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn deferred_reorders(&self) -> usize {
        self.calls
            .iter()
            .filter(|(_, call)| matches!(call, HostCall::DeferredReorder(_)))
            .count()
    }

    pub fn last_resize(&self) -> Option<Size> {
        self.calls.iter().rev().find_map(|(_, call)| match call {
            HostCall::Resize(size) => Some(*size),
            _ => None,
        })
    }
}

impl NodeHost for RecordingHost {
    fn create_text_input(
        &mut self,
        node: NodeId,
        name: &str,
        _config: TextInputConfig,
    ) -> Option<ElementId> {
        self.next_element += 1;
        let element = ElementId::new(self.next_element);
        self.calls.push((
            node,
            HostCall::Create {
                name: name.to_owned(),
                element,
            },
        ));
        (!self.attach_later).then_some(element)
    }

    fn detach_element(&mut self, element: ElementId) {
        self.calls.push((NodeId::new(0), HostCall::Detach(element)));
    }

    fn request_resize(&mut self, node: NodeId, size: Size) {
        self.calls.push((node, HostCall::Resize(size)));
    }

    fn request_redraw(&mut self, node: NodeId) {
        self.calls.push((node, HostCall::Redraw));
    }

    fn schedule_deferred_reorder(&mut self, node: NodeId, delay: Duration) {
        self.calls.push((node, HostCall::DeferredReorder(delay)));
    }

    fn notify_rejection(&mut self, node: NodeId, message: &str) {
        self.calls
            .push((node, HostCall::Rejection(message.to_owned())));
    }
}

/// The flat positional list the host saves for a node with `fields` values.
pub fn saved_values(join_string: &str, trim: bool, fields: &[&str]) -> Vec<Value> {
    let owned = fields.iter().map(|field| (*field).to_owned()).collect();
    saved_values_with_payload(
        join_string,
        trim,
        fields,
        json!(PayloadSnapshot::new(owned).encode()),
    )
}

pub fn saved_values_with_payload(
    join_string: &str,
    trim: bool,
    fields: &[&str],
    payload: Value,
) -> Vec<Value> {
    let mut saved = vec![
        WidgetValue::Text(join_string.to_owned()).to_json(),
        WidgetValue::Toggle(trim).to_json(),
    ];
    saved.extend(fields.iter().map(|field| json!(field)));
    saved.push(payload);
    saved
}

pub fn sample_wildcards() -> Vec<String> {
    WILDCARD_NAMES
        .iter()
        .map(|name| format!("__{name}__"))
        .collect()
}

pub fn sample_presets() -> Vec<String> {
    PRESETS.iter().map(|preset| (*preset).to_owned()).collect()
}

pub fn temp_workflow_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("workflow.json");
    Ok((dir, path))
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of prompt-like field texts.
#[derive(Debug, Clone)]
pub struct PromptFaker {
    rng: DeterministicRng,
}

impl PromptFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn prompt(&mut self) -> String {
        let subject = self.pick(&SUBJECTS);
        let style = self.pick(&STYLES);
        let mood = self.pick(&MOODS);
        match self.int_n(4) {
            0 => format!("{subject}, {style}"),
            1 => format!("{subject} {mood}"),
            2 => format!("  {style}, {mood},  "),
            _ => format!("{subject},\n{style} {mood}"),
        }
    }

    /// `count` prompts; roughly one in five is left empty.
    pub fn field_values(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| {
                if self.int_n(5) == 0 {
                    String::new()
                } else {
                    self.prompt()
                }
            })
            .collect()
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::{PromptFaker, RecordingHost, sample_wildcards, saved_values};
    use joiner_app::{JoinerNode, NodeId};
    use serde_json::json;

    #[test]
    fn faker_is_deterministic() {
        let mut left = PromptFaker::new(42);
        let mut right = PromptFaker::new(42);
        assert_eq!(left.field_values(8), right.field_values(8));
    }

    #[test]
    fn faker_varies_across_seeds() {
        let distinct = (1_u64..10)
            .map(|seed| PromptFaker::new(seed).prompt())
            .collect::<std::collections::BTreeSet<_>>();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn saved_values_end_with_payload() {
        let saved = saved_values(", ", true, &["a", "b"]);
        assert_eq!(saved.len(), 5);
        assert_eq!(saved.last(), Some(&json!(r#"["a","b"]"#)));
    }

    #[test]
    fn recording_host_tracks_field_creation() {
        let mut host = RecordingHost::new();
        let _node = JoinerNode::create(NodeId::new(1), &mut host);
        assert_eq!(
            host.created(),
            vec!["join_string", "text_0", "text_1", "text_2", "text_3", "text_4"]
        );
        assert_eq!(host.deferred_reorders(), 1);
        assert!(host.last_resize().is_some());
    }

    #[test]
    fn wildcards_are_wrapped() {
        assert!(
            sample_wildcards()
                .iter()
                .all(|name| name.starts_with("__") && name.ends_with("__"))
        );
    }
}
