// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::SlotIndex;
use crate::node::{JoinerNode, NodeHost};

const ESCAPED_NEWLINE: &str = "\\n";

/// Cleans every value and joins the non-empty ones. Cleaning trims
/// whitespace (when `trim` is set), strips surrounding commas, then trims
/// again.
pub fn join_texts<S: AsRef<str>>(values: &[S], join_string: &str, trim: bool) -> String {
    values
        .iter()
        .filter_map(|value| clean_value(value.as_ref(), trim))
        .collect::<Vec<_>>()
        .join(join_string)
}

fn clean_value(value: &str, trim: bool) -> Option<&str> {
    let mut cleaned = value;
    if trim {
        cleaned = cleaned.trim();
    }
    cleaned = cleaned.trim_matches(',');
    if trim {
        cleaned = cleaned.trim();
    }
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Splits on a literal delimiter. A typed `\n` means newline; an empty
/// delimiter keeps the text whole.
pub fn split_text(text: &str, delimiter: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let delimiter = if delimiter == ESCAPED_NEWLINE {
        "\n"
    } else {
        delimiter
    };
    if delimiter.is_empty() {
        return vec![text.to_owned()];
    }
    text.split(delimiter).map(str::to_owned).collect()
}

/// Spreads `items` over `slot_count` slots: item i fills slot i and the last
/// slot takes every remaining item joined by `join_string`.
pub fn distribute_import<S: AsRef<str>>(
    items: &[S],
    slot_count: usize,
    join_string: &str,
) -> Vec<String> {
    let Some(last) = slot_count.checked_sub(1) else {
        return Vec::new();
    };
    items
        .iter()
        .take(last)
        .map(|item| item.as_ref().to_owned())
        .chain(items.get(last..).filter(|rest| !rest.is_empty()).map(|rest| {
            rest.iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(join_string)
        }))
        .collect()
}

impl JoinerNode {
    /// Splits the field at `slot` and spreads the parts over the fields from
    /// `slot` onwards, growing the list up to the ceiling. Returns the number
    /// of fields written.
    pub fn split_field<H: NodeHost>(
        &mut self,
        slot: SlotIndex,
        delimiter: &str,
        host: &mut H,
    ) -> usize {
        let Some(text) = self.field_value(slot).map(str::to_owned) else {
            return 0;
        };
        let parts = split_text(&text, delimiter);
        if parts.len() <= 1 {
            return 0;
        }

        let room = self.limits.max.saturating_sub(self.field_count());
        let existing = self
            .widgets
            .field_slots()
            .into_iter()
            .filter(|candidate| *candidate >= slot)
            .count();
        let available = existing + room.min(parts.len().saturating_sub(existing));
        let values = distribute_import(&parts, available, self.join_string());

        let mut target = slot;
        for value in &values {
            while self.widgets.field(target).is_none() && self.widgets.max_slot() > Some(target) {
                target = target.next();
            }
            self.ensure_field(target, host);
            self.set_field_value(target, value, host);
            target = target.next();
        }
        log::debug!(
            "node {} split field {slot} into {} fields",
            self.id().get(),
            values.len()
        );
        values.len()
    }
}
