// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The completion popup. There is one per session; binding it to a field
//! releases whichever field held it before.

use crate::ids::*;
use crate::trigger::{ClosingDelimiter, TriggerSpan, floor_char_boundary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub node: NodeId,
    pub slot: SlotIndex,
}

impl FieldRef {
    pub const fn new(node: NodeId, slot: SlotIndex) -> Self {
        Self { node, slot }
    }
}

/// Screen cell of a field's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub column: u16,
    pub row: u16,
}

impl Anchor {
    pub const fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }

    /// Popup position for a trigger at byte `start` of `text`: one row below
    /// the trigger's line, aligned with its column.
    pub fn below_trigger(self, text: &str, start: usize) -> Self {
        let head = &text[..floor_char_boundary(text, start)];
        let line = head.matches('\n').count();
        let column = head.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
        Self {
            column: self
                .column
                .saturating_add(u16::try_from(column).unwrap_or(u16::MAX)),
            row: self
                .row
                .saturating_add(u16::try_from(line).unwrap_or(u16::MAX))
                .saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKey {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub field: FieldRef,
    pub span: TriggerSpan,
    pub position: Anchor,
    candidates: Vec<String>,
    highlight: usize,
}

impl Binding {
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.candidates.get(self.highlight).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Hidden,
    Visible(Binding),
}

/// What a key did to a visible overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    /// Overlay hidden or key not meant for it; the field handles the key.
    Ignored,
    Moved(usize),
    Closed,
    Commit {
        field: FieldRef,
        span: TriggerSpan,
        candidate: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionOverlay {
    state: OverlayState,
}

impl CompletionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, OverlayState::Visible(_))
    }

    pub fn binding(&self) -> Option<&Binding> {
        match &self.state {
            OverlayState::Visible(binding) => Some(binding),
            OverlayState::Hidden => None,
        }
    }

    pub fn owner(&self) -> Option<FieldRef> {
        self.binding().map(|binding| binding.field)
    }

    /// Binds the overlay to `field` with a fresh candidate list and the
    /// highlight reset to the first entry. Returns the field that lost the
    /// binding, if it was a different one. An empty list hides instead.
    pub fn show(
        &mut self,
        candidates: Vec<String>,
        position: Anchor,
        field: FieldRef,
        span: TriggerSpan,
    ) -> Option<FieldRef> {
        let previous = self.hide();
        if candidates.is_empty() {
            return previous;
        }
        self.state = OverlayState::Visible(Binding {
            field,
            span,
            position,
            candidates,
            highlight: 0,
        });
        previous.filter(|owner| *owner != field)
    }

    /// Returns the field that held the binding.
    pub fn hide(&mut self) -> Option<FieldRef> {
        match std::mem::take(&mut self.state) {
            OverlayState::Visible(binding) => Some(binding.field),
            OverlayState::Hidden => None,
        }
    }

    pub fn handle_key(&mut self, key: OverlayKey) -> OverlayAction {
        let OverlayState::Visible(binding) = &mut self.state else {
            return OverlayAction::Ignored;
        };
        let len = binding.candidates.len();
        match key {
            OverlayKey::Down => {
                binding.highlight = (binding.highlight + 1) % len;
                OverlayAction::Moved(binding.highlight)
            }
            OverlayKey::Up => {
                binding.highlight = (binding.highlight + len - 1) % len;
                OverlayAction::Moved(binding.highlight)
            }
            OverlayKey::Enter | OverlayKey::Tab => {
                let index = binding.highlight;
                self.commit(index)
            }
            OverlayKey::Escape => {
                self.hide();
                OverlayAction::Closed
            }
        }
    }

    /// Pointer hover moves the highlight. Out-of-range indices are ignored.
    pub fn hover(&mut self, index: usize) -> bool {
        match &mut self.state {
            OverlayState::Visible(binding) if index < binding.candidates.len() => {
                binding.highlight = index;
                true
            }
            _ => false,
        }
    }

    /// Takes the candidate at `index` and hides the overlay.
    pub fn commit(&mut self, index: usize) -> OverlayAction {
        let Some(binding) = self.binding() else {
            return OverlayAction::Ignored;
        };
        let Some(candidate) = binding.candidates.get(index).cloned() else {
            return OverlayAction::Ignored;
        };
        let (field, span) = (binding.field, binding.span);
        self.hide();
        OverlayAction::Commit {
            field,
            span,
            candidate,
        }
    }
}

/// Replaces `text[start..selection_end]` with `candidate` and returns the new
/// text with the cursor placed after the inserted candidate. A closing
/// delimiter already waiting after the selection is consumed when the
/// candidate carries its own.
pub fn apply_completion(
    text: &str,
    start: usize,
    selection_end: usize,
    candidate: &str,
    closer: ClosingDelimiter,
) -> (String, usize) {
    let start = floor_char_boundary(text, start);
    let end = floor_char_boundary(text, selection_end).max(start);
    let after = &text[end..];

    let mut consumed = 0;
    if !closer.text.is_empty() && candidate.ends_with(closer.text) {
        let padded = if closer.allow_leading_spaces {
            after.trim_start_matches(' ')
        } else {
            after
        };
        if padded.starts_with(closer.text) {
            consumed = after.len() - padded.len() + closer.text.len();
        }
    }

    let mut updated = String::with_capacity(text.len() + candidate.len());
    updated.push_str(&text[..start]);
    updated.push_str(candidate);
    updated.push_str(&after[consumed..]);
    (updated, start + candidate.len())
}
