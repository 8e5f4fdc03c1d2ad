// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::candidates::CandidateSource;
use crate::node::{JoinerNode, NodeHost};
use crate::overlay::{
    Anchor, CompletionOverlay, FieldRef, OverlayAction, OverlayKey, apply_completion,
};
use crate::trigger::TriggerScanner;

/// Result of an input event on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Hidden,
    Shown {
        count: usize,
        released: Option<FieldRef>,
    },
}

/// Result of a key, click or close event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not consumed; the focused field handles the key itself.
    Passthrough,
    Moved(usize),
    Closed,
    /// The field was rewritten; focus returns to it with the cursor at
    /// `cursor`.
    Committed { field: FieldRef, cursor: usize },
}

/// Autocomplete state shared by every field of every node in one editor.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    scanner: TriggerScanner,
    source: CandidateSource,
    overlay: CompletionOverlay,
}

impl EditorSession {
    pub fn new(scanner: TriggerScanner, source: CandidateSource) -> Self {
        Self {
            scanner,
            source,
            overlay: CompletionOverlay::new(),
        }
    }

    pub fn source(&self) -> &CandidateSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut CandidateSource {
        &mut self.source
    }

    pub fn overlay(&self) -> &CompletionOverlay {
        &self.overlay
    }

    /// Re-scans `field` after an edit and shows or hides the popup.
    pub fn on_input(
        &mut self,
        field: FieldRef,
        text: &str,
        cursor: usize,
        anchor: Anchor,
    ) -> InputOutcome {
        let Some(found) = self.scanner.scan(text, cursor) else {
            self.overlay.hide();
            return InputOutcome::Hidden;
        };
        let candidates = self.source.filter(found.kind, &found.query);
        if candidates.is_empty() {
            self.overlay.hide();
            return InputOutcome::Hidden;
        }
        let count = candidates.len();
        let position = anchor.below_trigger(text, found.start);
        let released = self
            .overlay
            .show(candidates, position, field, found.span());
        if let Some(previous) = released {
            log::debug!(
                "completion overlay moved from node {} slot {} to node {} slot {}",
                previous.node.get(),
                previous.slot,
                field.node.get(),
                field.slot
            );
        }
        InputOutcome::Shown { count, released }
    }

    /// Routes a navigation or commit key. `node` must be the node that owns
    /// the bound field; a mismatch closes the overlay.
    pub fn on_key<H: NodeHost>(
        &mut self,
        key: OverlayKey,
        node: &mut JoinerNode,
        host: &mut H,
    ) -> KeyOutcome {
        let action = self.overlay.handle_key(key);
        self.resolve(action, node, host)
    }

    pub fn on_hover(&mut self, index: usize) -> bool {
        self.overlay.hover(index)
    }

    pub fn on_click<H: NodeHost>(
        &mut self,
        index: usize,
        node: &mut JoinerNode,
        host: &mut H,
    ) -> KeyOutcome {
        let action = self.overlay.commit(index);
        self.resolve(action, node, host)
    }

    pub fn close(&mut self) -> KeyOutcome {
        match self.overlay.hide() {
            Some(_) => KeyOutcome::Closed,
            None => KeyOutcome::Passthrough,
        }
    }

    /// Drops the binding when `field` is torn down.
    pub fn forget_field(&mut self, field: FieldRef) -> bool {
        if self.overlay.owner() == Some(field) {
            self.overlay.hide();
            return true;
        }
        false
    }

    /// Drops the binding when it points at a slot `node` no longer has.
    pub fn release_stale_binding(&mut self, node: &JoinerNode) -> bool {
        match self.overlay.owner() {
            Some(owner)
                if owner.node == node.id() && node.widgets().field(owner.slot).is_none() =>
            {
                self.forget_field(owner)
            }
            _ => false,
        }
    }

    fn resolve<H: NodeHost>(
        &mut self,
        action: OverlayAction,
        node: &mut JoinerNode,
        host: &mut H,
    ) -> KeyOutcome {
        match action {
            OverlayAction::Ignored => KeyOutcome::Passthrough,
            OverlayAction::Moved(index) => KeyOutcome::Moved(index),
            OverlayAction::Closed => KeyOutcome::Closed,
            OverlayAction::Commit {
                field,
                span,
                candidate,
            } => {
                if field.node != node.id() {
                    log::warn!(
                        "completion for node {} delivered to node {}; dropped",
                        field.node.get(),
                        node.id().get()
                    );
                    return KeyOutcome::Closed;
                }
                let Some(current) = node.field_value(field.slot) else {
                    return KeyOutcome::Closed;
                };
                let (updated, cursor) = apply_completion(
                    current,
                    span.start,
                    span.end,
                    &candidate,
                    span.kind.closer(),
                );
                if !node.set_field_value(field.slot, &updated, host) {
                    return KeyOutcome::Closed;
                }
                KeyOutcome::Committed { field, cursor }
            }
        }
    }
}
