// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Field list management: creation, LIFO removal, cardinality bounds and the
//! rank-based widget order.

use crate::ids::*;
use crate::model::*;
use crate::node::{JoinerNode, NodeHost, TextInputConfig};

pub const JOIN_STRING_RANK: u32 = 0;
pub const TRIM_WHITESPACE_RANK: u32 = 1;
pub const ACTION_RANK: u32 = 2;
pub const FIELD_BASE_RANK: u32 = 100;
pub const PAYLOAD_RANK: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityRejection {
    AtMaximum { max: usize },
    AtMinimum { min: usize },
}

impl CapacityRejection {
    pub fn message(self) -> String {
        match self {
            Self::AtMaximum { max } => format!("Maximum {max} text boxes reached."),
            Self::AtMinimum { min: 1 } => "At least 1 text box is required.".to_owned(),
            Self::AtMinimum { min } => format!("At least {min} text boxes are required."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    Created(SlotIndex),
    Existing(SlotIndex),
    Removed(SlotIndex),
    Rejected(CapacityRejection),
}

pub fn widget_rank(widget: &Widget) -> u32 {
    match widget.kind {
        WidgetKind::JoinString => JOIN_STRING_RANK,
        WidgetKind::TrimWhitespace => TRIM_WHITESPACE_RANK,
        WidgetKind::Action(_) => ACTION_RANK,
        WidgetKind::Field(slot) => {
            FIELD_BASE_RANK.saturating_add(u32::try_from(slot.get()).unwrap_or(u32::MAX))
        }
        WidgetKind::Payload => PAYLOAD_RANK,
    }
}

impl JoinerNode {
    /// Returns the field at `slot`, creating an empty one when missing.
    /// Creating never checks the ceiling: callers that respond to user input
    /// go through [`JoinerNode::add_field`].
    pub fn ensure_field<H: NodeHost>(&mut self, slot: SlotIndex, host: &mut H) -> FieldChange {
        if self.widgets.field(slot).is_some() {
            return FieldChange::Existing(slot);
        }
        self.create_field(slot, host);
        self.structure_changed(host);
        FieldChange::Created(slot)
    }

    pub fn add_field<H: NodeHost>(&mut self, host: &mut H) -> FieldChange {
        if self.widgets.field_count() >= self.limits.max {
            let rejection = CapacityRejection::AtMaximum {
                max: self.limits.max,
            };
            host.notify_rejection(self.id(), &rejection.message());
            return FieldChange::Rejected(rejection);
        }

        let slot = self
            .widgets
            .max_slot()
            .map_or(SlotIndex::new(0), SlotIndex::next);
        self.create_field(slot, host);
        self.structure_changed(host);
        log::debug!("node {} added field {slot}", self.id().get());
        FieldChange::Created(slot)
    }

    /// Removes the highest slot; the count never drops below the floor.
    pub fn remove_field<H: NodeHost>(&mut self, host: &mut H) -> FieldChange {
        let count = self.widgets.field_count();
        let Some(slot) = self.widgets.max_slot() else {
            let rejection = CapacityRejection::AtMinimum {
                min: self.limits.min,
            };
            host.notify_rejection(self.id(), &rejection.message());
            return FieldChange::Rejected(rejection);
        };
        if count <= self.limits.min {
            let rejection = CapacityRejection::AtMinimum {
                min: self.limits.min,
            };
            host.notify_rejection(self.id(), &rejection.message());
            return FieldChange::Rejected(rejection);
        }

        self.teardown_field(slot, host);
        self.structure_changed(host);
        log::debug!("node {} removed field {slot}", self.id().get());
        FieldChange::Removed(slot)
    }

    /// Re-asserts the total widget order. Returns whether anything moved.
    pub fn reorder(&mut self) -> bool {
        self.widgets.sort_by_rank(widget_rank)
    }

    pub(crate) fn create_field<H: NodeHost>(&mut self, slot: SlotIndex, host: &mut H) {
        let mut widget = Widget::field(slot);
        widget.element = host.create_text_input(
            self.id(),
            &widget.name,
            TextInputConfig { multiline: true },
        );
        // Hosts append new widgets; the next reorder moves it into place.
        self.widgets.push(widget);
    }

    /// Detaches the element before the widget leaves the list.
    pub(crate) fn teardown_field<H: NodeHost>(&mut self, slot: SlotIndex, host: &mut H) -> bool {
        let Some(position) = self.widgets.field_position(slot) else {
            return false;
        };
        if let Some(element) = self
            .widgets
            .at(position)
            .and_then(|widget| widget.element)
        {
            host.detach_element(element);
        }
        self.widgets.remove_at(position).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{CapacityRejection, FieldChange};
    use crate::node::test_host::NullHost;
    use crate::{
        ADD_FIELD_WIDGET, FieldLimits, JOIN_STRING_WIDGET, JoinerNode, MAX_FIELDS, NodeId,
        PAYLOAD_WIDGET, REMOVE_FIELD_WIDGET, SlotIndex, TRIM_WHITESPACE_WIDGET,
    };

    fn node_with(host: &mut NullHost, initial: usize) -> JoinerNode {
        JoinerNode::create_with_limits(
            NodeId::new(7),
            FieldLimits {
                initial,
                ..FieldLimits::default()
            },
            host,
        )
    }

    #[test]
    fn add_field_assigns_next_slot() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 3);

        assert_eq!(
            node.add_field(&mut host),
            FieldChange::Created(SlotIndex::new(3))
        );
        assert_eq!(node.field_count(), 4);
        assert_eq!(node.snapshot().values().len(), 4);
    }

    #[test]
    fn add_field_rejects_at_ceiling_without_mutation() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, MAX_FIELDS);
        let before = node.clone();

        assert_eq!(
            node.add_field(&mut host),
            FieldChange::Rejected(CapacityRejection::AtMaximum { max: MAX_FIELDS })
        );
        assert_eq!(node, before);
        assert_eq!(host.rejections, vec!["Maximum 25 text boxes reached.".to_owned()]);
    }

    #[test]
    fn remove_field_pops_highest_slot_and_detaches_element() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 3);
        let element = node
            .widgets()
            .field(SlotIndex::new(2))
            .and_then(|widget| widget.element);

        assert_eq!(
            node.remove_field(&mut host),
            FieldChange::Removed(SlotIndex::new(2))
        );
        assert_eq!(node.field_count(), 2);
        assert_eq!(host.detached, element.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn remove_field_at_floor_is_noop() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 1);
        node.set_field_value(SlotIndex::new(0), "keep", &mut host);
        let before = node.clone();

        assert_eq!(
            node.remove_field(&mut host),
            FieldChange::Rejected(CapacityRejection::AtMinimum { min: 1 })
        );
        assert_eq!(node, before);
        assert_eq!(host.rejections, vec!["At least 1 text box is required.".to_owned()]);
    }

    #[test]
    fn ensure_field_is_idempotent() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 2);
        node.set_field_value(SlotIndex::new(1), "kept", &mut host);

        assert_eq!(
            node.ensure_field(SlotIndex::new(1), &mut host),
            FieldChange::Existing(SlotIndex::new(1))
        );
        assert_eq!(node.field_value(SlotIndex::new(1)), Some("kept"));
        assert_eq!(
            node.ensure_field(SlotIndex::new(4), &mut host),
            FieldChange::Created(SlotIndex::new(4))
        );
        assert_eq!(node.field_count(), 3);
    }

    #[test]
    fn reorder_places_fields_between_actions_and_payload() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 0);
        node.ensure_field(SlotIndex::new(2), &mut host);
        node.ensure_field(SlotIndex::new(0), &mut host);
        node.ensure_field(SlotIndex::new(1), &mut host);

        assert_eq!(
            node.widgets().names(),
            vec![
                JOIN_STRING_WIDGET,
                TRIM_WHITESPACE_WIDGET,
                ADD_FIELD_WIDGET,
                REMOVE_FIELD_WIDGET,
                "text_0",
                "text_1",
                "text_2",
                PAYLOAD_WIDGET,
            ]
        );
    }

    #[test]
    fn reorder_sorts_scrambled_widgets_and_is_idempotent() {
        let mut host = NullHost::default();
        let mut node = node_with(&mut host, 0);
        node.ensure_field(SlotIndex::new(2), &mut host);
        node.ensure_field(SlotIndex::new(10), &mut host);

        let sorted = std::mem::take(&mut node.widgets);
        for name in [
            "text_10",
            ADD_FIELD_WIDGET,
            PAYLOAD_WIDGET,
            "text_2",
            JOIN_STRING_WIDGET,
            REMOVE_FIELD_WIDGET,
            TRIM_WHITESPACE_WIDGET,
        ] {
            let widget = sorted.get(name).cloned().expect("widget exists");
            node.widgets.push(widget);
        }

        assert!(node.reorder());
        let expected = vec![
            JOIN_STRING_WIDGET,
            TRIM_WHITESPACE_WIDGET,
            ADD_FIELD_WIDGET,
            REMOVE_FIELD_WIDGET,
            "text_2",
            "text_10",
            PAYLOAD_WIDGET,
        ];
        assert_eq!(node.widgets().names(), expected);

        assert!(!node.reorder());
        assert_eq!(node.widgets().names(), expected);
    }
}
