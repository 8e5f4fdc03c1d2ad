// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use crate::ids::*;
use crate::join::join_texts;
use crate::model::*;
use crate::payload::PayloadSnapshot;

pub const DEFAULT_FIELDS: usize = 5;
pub const MIN_FIELDS: usize = 1;
pub const MAX_FIELDS: usize = 25;
pub const DEFERRED_REORDER_DELAY: Duration = Duration::from_millis(50);

/// Configuration handed to the host widget factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextInputConfig {
    pub multiline: bool,
}

/// Contracts the surrounding node editor provides. All calls are
/// fire-and-forget from the node's point of view.
pub trait NodeHost {
    /// Creates the interactive element behind a text widget. Hosts that
    /// attach elements asynchronously return `None` and call
    /// [`JoinerNode::attach_element`] later.
    fn create_text_input(
        &mut self,
        node: NodeId,
        name: &str,
        config: TextInputConfig,
    ) -> Option<ElementId>;
    fn detach_element(&mut self, element: ElementId);
    fn request_resize(&mut self, node: NodeId, size: Size);
    fn request_redraw(&mut self, node: NodeId);
    fn schedule_deferred_reorder(&mut self, node: NodeId, delay: Duration);
    fn notify_rejection(&mut self, node: NodeId, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub initial: usize,
    pub min: usize,
    pub max: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            initial: DEFAULT_FIELDS,
            min: MIN_FIELDS,
            max: MAX_FIELDS,
        }
    }
}

/// One `TextJoiner` node instance: fixed widgets, the dynamic field list and
/// the hidden payload that persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinerNode {
    id: NodeId,
    pub(crate) widgets: WidgetList,
    pub(crate) limits: FieldLimits,
    pub(crate) size: Size,
    pub(crate) snapshot: PayloadSnapshot,
}

impl JoinerNode {
    pub fn create<H: NodeHost>(id: NodeId, host: &mut H) -> Self {
        Self::create_with_limits(id, FieldLimits::default(), host)
    }

    pub fn create_with_limits<H: NodeHost>(id: NodeId, limits: FieldLimits, host: &mut H) -> Self {
        let mut widgets = WidgetList::new();
        let mut join = Widget::text(
            JOIN_STRING_WIDGET,
            WidgetKind::JoinString,
            DEFAULT_JOIN_STRING,
        );
        join.element = host.create_text_input(
            id,
            JOIN_STRING_WIDGET,
            TextInputConfig { multiline: false },
        );
        widgets.push(join);
        widgets.push(Widget::toggle(
            TRIM_WHITESPACE_WIDGET,
            WidgetKind::TrimWhitespace,
            true,
        ));
        widgets.push(Widget::payload());
        widgets.push(Widget::action(ActionKind::AddField, limits.max));
        widgets.push(Widget::action(ActionKind::RemoveField, limits.max));

        let mut node = Self {
            id,
            widgets,
            limits,
            size: Size::default(),
            snapshot: PayloadSnapshot::default(),
        };
        for slot in 0..limits.initial.min(limits.max) {
            node.create_field(SlotIndex::new(slot), host);
        }
        node.structure_changed(host);
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn widgets(&self) -> &WidgetList {
        &self.widgets
    }

    pub fn snapshot(&self) -> &PayloadSnapshot {
        &self.snapshot
    }

    pub fn field_count(&self) -> usize {
        self.widgets.field_count()
    }

    pub fn field_value(&self, slot: SlotIndex) -> Option<&str> {
        self.widgets
            .field(slot)
            .and_then(|widget| widget.value.as_text())
    }

    /// Field values in ascending slot order.
    pub fn field_values(&self) -> Vec<String> {
        self.widgets
            .field_slots()
            .into_iter()
            .map(|slot| self.field_value(slot).unwrap_or_default().to_owned())
            .collect()
    }

    pub fn join_string(&self) -> &str {
        self.widgets
            .get(JOIN_STRING_WIDGET)
            .and_then(|widget| widget.value.as_text())
            .unwrap_or(DEFAULT_JOIN_STRING)
    }

    pub fn trim_whitespace(&self) -> bool {
        self.widgets
            .get(TRIM_WHITESPACE_WIDGET)
            .and_then(|widget| widget.value.as_toggle())
            .unwrap_or(true)
    }

    pub fn joined_output(&self) -> String {
        join_texts(
            &self.field_values(),
            self.join_string(),
            self.trim_whitespace(),
        )
    }

    /// Value-change hook of a field. Returns `false` when the slot does not
    /// exist.
    pub fn set_field_value<H: NodeHost>(
        &mut self,
        slot: SlotIndex,
        value: &str,
        host: &mut H,
    ) -> bool {
        let Some(widget) = self.widgets.field_mut(slot) else {
            return false;
        };
        widget.value = WidgetValue::Text(value.to_owned());
        self.recompute_snapshot();
        host.request_redraw(self.id);
        true
    }

    /// Value-change hook of a fixed widget. Shape mismatches and unknown
    /// names are ignored.
    pub fn set_fixed_value<H: NodeHost>(
        &mut self,
        name: &str,
        value: WidgetValue,
        host: &mut H,
    ) -> bool {
        let Some(widget) = self.widgets.get_mut(name) else {
            return false;
        };
        if !matches!(
            widget.kind,
            WidgetKind::JoinString | WidgetKind::TrimWhitespace
        ) || std::mem::discriminant(&widget.value) != std::mem::discriminant(&value)
        {
            return false;
        }
        widget.value = value;
        host.request_redraw(self.id);
        true
    }

    /// Host-driven resize, e.g. restoring a saved size. Height never drops
    /// below what the widgets need.
    pub fn resize(&mut self, size: Size) {
        let computed = self.widgets.compute_size();
        self.size = Size::new(
            size.width.max(computed.width),
            size.height.max(computed.height),
        );
    }

    /// Records an element the host finished attaching after creation.
    pub fn attach_element(&mut self, name: &str, element: ElementId) -> bool {
        match self.widgets.get_mut(name) {
            Some(widget) => {
                widget.element = Some(element);
                true
            }
            None => false,
        }
    }

    /// Positional values for the host's save envelope.
    pub fn serialize(&self) -> Vec<serde_json::Value> {
        self.widgets.serialize_values()
    }

    /// Follow-up pass the host runs once after the scheduled delay.
    pub fn run_deferred_reorder<H: NodeHost>(&mut self, host: &mut H) {
        self.reorder();
        self.request_layout(host);
    }

    pub(crate) fn structure_changed<H: NodeHost>(&mut self, host: &mut H) {
        self.reorder();
        self.recompute_snapshot();
        self.request_layout(host);
        host.schedule_deferred_reorder(self.id, DEFERRED_REORDER_DELAY);
    }

    fn request_layout<H: NodeHost>(&mut self, host: &mut H) {
        let computed = self.widgets.compute_size();
        self.size = Size::new(self.size.width.max(computed.width), computed.height);
        host.request_resize(self.id, self.size);
        host.request_redraw(self.id);
    }
}
