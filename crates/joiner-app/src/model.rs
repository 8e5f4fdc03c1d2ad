// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;

use crate::ids::*;

pub const NODE_TYPE: &str = "TextJoiner";
pub const JOIN_STRING_WIDGET: &str = "join_string";
pub const TRIM_WHITESPACE_WIDGET: &str = "trim_whitespace";
pub const PAYLOAD_WIDGET: &str = "data_payload";
pub const ADD_FIELD_WIDGET: &str = "add_text";
pub const REMOVE_FIELD_WIDGET: &str = "remove_text";

pub const DEFAULT_JOIN_STRING: &str = "\n";
pub const EMPTY_PAYLOAD: &str = "[]";

const NODE_TITLE_HEIGHT: u32 = 2;
const LINE_WIDGET_HEIGHT: u32 = 1;
const MULTILINE_WIDGET_HEIGHT: u32 = 4;
const MIN_NODE_WIDTH: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AddField,
    RemoveField,
}

impl ActionKind {
    pub const fn widget_name(self) -> &'static str {
        match self {
            Self::AddField => ADD_FIELD_WIDGET,
            Self::RemoveField => REMOVE_FIELD_WIDGET,
        }
    }

    pub fn label(self, max_fields: usize) -> String {
        match self {
            Self::AddField => format!("Add text box (Max {max_fields})"),
            Self::RemoveField => "Remove last text box".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    JoinString,
    TrimWhitespace,
    Field(SlotIndex),
    Payload,
    Action(ActionKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetValue {
    Toggle(bool),
    Text(String),
    Empty,
}

impl WidgetValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Toggle(_) | Self::Empty => None,
        }
    }

    pub fn as_toggle(&self) -> Option<bool> {
        match self {
            Self::Toggle(flag) => Some(*flag),
            Self::Text(_) | Self::Empty => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Toggle(flag) => Value::Bool(*flag),
            Self::Text(text) => Value::String(text.clone()),
            Self::Empty => Value::Null,
        }
    }

    /// Converts a saved value into this widget's value type, or `None` when
    /// the saved value has a different shape.
    pub fn coerce(&self, saved: &Value) -> Option<Self> {
        match (self, saved) {
            (Self::Toggle(_), Value::Bool(flag)) => Some(Self::Toggle(*flag)),
            (Self::Text(_), Value::String(text)) => Some(Self::Text(text.clone())),
            (Self::Text(_), Value::Number(number)) => Some(Self::Text(number.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub name: String,
    pub kind: WidgetKind,
    pub value: WidgetValue,
    pub serialize: bool,
    pub hidden: bool,
    pub multiline: bool,
    pub element: Option<ElementId>,
}

impl Widget {
    pub fn text(name: &str, kind: WidgetKind, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            value: WidgetValue::Text(value.to_owned()),
            serialize: true,
            hidden: false,
            multiline: false,
            element: None,
        }
    }

    pub fn field(slot: SlotIndex) -> Self {
        Self {
            multiline: true,
            ..Self::text(&slot.widget_name(), WidgetKind::Field(slot), "")
        }
    }

    pub fn toggle(name: &str, kind: WidgetKind, value: bool) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            value: WidgetValue::Toggle(value),
            serialize: true,
            hidden: false,
            multiline: false,
            element: None,
        }
    }

    pub fn payload() -> Self {
        Self {
            hidden: true,
            ..Self::text(PAYLOAD_WIDGET, WidgetKind::Payload, EMPTY_PAYLOAD)
        }
    }

    pub fn action(action: ActionKind, max_fields: usize) -> Self {
        Self {
            name: action.widget_name().to_owned(),
            kind: WidgetKind::Action(action),
            value: WidgetValue::Text(action.label(max_fields)),
            serialize: false,
            hidden: false,
            multiline: false,
            element: None,
        }
    }

    pub fn slot(&self) -> Option<SlotIndex> {
        match self.kind {
            WidgetKind::Field(slot) => Some(slot),
            _ => None,
        }
    }

    fn height(&self) -> u32 {
        if self.hidden {
            0
        } else if self.multiline {
            MULTILINE_WIDGET_HEIGHT
        } else {
            LINE_WIDGET_HEIGHT
        }
    }
}

/// Mirror of the host node's widget vector, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WidgetList {
    widgets: Vec<Widget>,
}

impl WidgetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.widgets.iter().map(|widget| widget.name.as_str()).collect()
    }

    pub fn push(&mut self, widget: Widget) {
        self.widgets.push(widget);
    }

    pub fn get(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|widget| widget.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|widget| widget.name == name)
    }

    pub fn at(&self, index: usize) -> Option<&Widget> {
        self.widgets.get(index)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Widget> {
        (index < self.widgets.len()).then(|| self.widgets.remove(index))
    }

    pub fn field(&self, slot: SlotIndex) -> Option<&Widget> {
        self.widgets.iter().find(|widget| widget.slot() == Some(slot))
    }

    pub fn field_mut(&mut self, slot: SlotIndex) -> Option<&mut Widget> {
        self.widgets
            .iter_mut()
            .find(|widget| widget.slot() == Some(slot))
    }

    pub fn field_position(&self, slot: SlotIndex) -> Option<usize> {
        self.widgets
            .iter()
            .position(|widget| widget.slot() == Some(slot))
    }

    /// Slots of all attached fields, ascending.
    pub fn field_slots(&self) -> Vec<SlotIndex> {
        let mut slots = self
            .widgets
            .iter()
            .filter_map(Widget::slot)
            .collect::<Vec<_>>();
        slots.sort();
        slots
    }

    pub fn field_count(&self) -> usize {
        self.widgets
            .iter()
            .filter(|widget| widget.slot().is_some())
            .count()
    }

    pub fn max_slot(&self) -> Option<SlotIndex> {
        self.widgets.iter().filter_map(Widget::slot).max()
    }

    /// Stable sort; widgets with equal rank keep their relative order.
    pub fn sort_by_rank(&mut self, rank: impl Fn(&Widget) -> u32) -> bool {
        let before = self.names().join("\u{1f}");
        self.widgets.sort_by_key(|widget| rank(widget));
        before != self.names().join("\u{1f}")
    }

    /// Flat positional value list, the way the host persists a node.
    pub fn serialize_values(&self) -> Vec<Value> {
        self.widgets
            .iter()
            .filter(|widget| widget.serialize)
            .map(|widget| widget.value.to_json())
            .collect()
    }

    /// The host's positional restore: the i-th saved value goes to the i-th
    /// serializable widget when the shapes agree. Returns how many widgets
    /// were assigned.
    pub fn assign_positional(&mut self, saved: &[Value]) -> usize {
        let mut assigned = 0;
        for (widget, value) in self
            .widgets
            .iter_mut()
            .filter(|widget| widget.serialize)
            .zip(saved)
        {
            if let Some(coerced) = widget.value.coerce(value) {
                widget.value = coerced;
                assigned += 1;
            }
        }
        assigned
    }

    pub fn compute_size(&self) -> Size {
        let height = NODE_TITLE_HEIGHT + self.widgets.iter().map(Widget::height).sum::<u32>();
        let widest_label = self
            .widgets
            .iter()
            .filter(|widget| !widget.hidden)
            .map(|widget| widget_label_width(widget))
            .max()
            .unwrap_or(0);
        Size::new(MIN_NODE_WIDTH.max(widest_label), height)
    }
}

fn widget_label_width(widget: &Widget) -> u32 {
    let label = match (&widget.kind, &widget.value) {
        (WidgetKind::Action(_), WidgetValue::Text(label)) => label.chars().count(),
        _ => widget.name.chars().count(),
    };
    u32::try_from(label + 4).unwrap_or(u32::MAX)
}
