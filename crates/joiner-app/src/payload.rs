// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Payload reconciliation.
//!
//! The host persists a node as a flat positional list of widget values and
//! restores it by position, without knowing how many fields existed at save
//! time. The hidden `data_payload` widget carries a JSON list of every field
//! value; its length is the authoritative field count. Loading is two-phase:
//! [`JoinerNode::before_apply`] creates exactly that many fields before the
//! host assigns positional values, and [`JoinerNode::after_apply`] overwrites
//! every field from the parsed list afterwards.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::ids::*;
use crate::model::*;
use crate::node::{JoinerNode, NodeHost};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayloadSnapshot {
    values: Vec<String>,
}

impl PayloadSnapshot {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn encode(&self) -> String {
        // A list of strings always serializes.
        serde_json::to_string(&self.values).unwrap_or_else(|_| EMPTY_PAYLOAD.to_owned())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("decode payload JSON")?;
        let Value::Array(items) = value else {
            bail!("payload is not a list");
        };
        let values = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(text) => Ok(text),
                other => Err(anyhow::anyhow!(
                    "payload entry {index} is not a string: {other}"
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NoSavedValues,
    PayloadNotText,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Reconciled { fields: usize, clamped: bool },
    Fallback(FallbackReason),
}

/// State carried from [`JoinerNode::before_apply`] to
/// [`JoinerNode::after_apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRestore {
    parsed: std::result::Result<PayloadSnapshot, FallbackReason>,
    clamped: bool,
}

fn read_saved_payload(saved: &[Value]) -> std::result::Result<PayloadSnapshot, FallbackReason> {
    let Some(last) = saved.last() else {
        return Err(FallbackReason::NoSavedValues);
    };
    let Value::String(raw) = last else {
        return Err(FallbackReason::PayloadNotText);
    };
    PayloadSnapshot::parse(raw).map_err(|error| FallbackReason::Malformed(format!("{error:#}")))
}

impl JoinerNode {
    /// Writes the current field values, in slot order, into the payload
    /// widget. A missing payload widget leaves only the in-memory snapshot.
    pub fn recompute_snapshot(&mut self) {
        self.snapshot = PayloadSnapshot::new(self.field_values());
        let encoded = self.snapshot.encode();
        match self.widgets.get_mut(PAYLOAD_WIDGET) {
            Some(widget) => widget.value = WidgetValue::Text(encoded),
            None => log::debug!(
                "node {} has no {PAYLOAD_WIDGET} widget; snapshot not persisted",
                self.id().get()
            ),
        }
    }

    /// Phase one of loading: shape the field list to the payload's length so
    /// the host's positional assignment lands on the right widgets.
    pub fn before_apply<H: NodeHost>(&mut self, saved: &[Value], host: &mut H) -> PendingRestore {
        let parsed = read_saved_payload(saved);
        let mut clamped = false;

        let parsed = match parsed {
            Ok(mut snapshot) => {
                if snapshot.len() > self.limits.max {
                    log::warn!(
                        "node {} payload lists {} fields; keeping the first {}",
                        self.id().get(),
                        snapshot.len(),
                        self.limits.max
                    );
                    snapshot.values.truncate(self.limits.max);
                    clamped = true;
                }
                self.shape_fields(snapshot.len(), host);
                Ok(snapshot)
            }
            Err(reason) => {
                log::warn!(
                    "node {} payload unusable ({reason:?}); keeping positional values",
                    self.id().get()
                );
                Err(reason)
            }
        };

        PendingRestore { parsed, clamped }
    }

    /// Phase two of loading: the parsed payload wins over whatever the
    /// positional assignment produced.
    pub fn after_apply<H: NodeHost>(
        &mut self,
        pending: PendingRestore,
        host: &mut H,
    ) -> RestoreOutcome {
        let outcome = match pending.parsed {
            Ok(snapshot) => {
                for (slot, value) in snapshot.values.iter().enumerate() {
                    if let Some(widget) = self.widgets.field_mut(SlotIndex::new(slot)) {
                        widget.value = WidgetValue::Text(value.clone());
                    }
                }
                RestoreOutcome::Reconciled {
                    fields: snapshot.len(),
                    clamped: pending.clamped,
                }
            }
            Err(reason) => RestoreOutcome::Fallback(reason),
        };
        self.recompute_snapshot();
        host.request_redraw(self.id());
        outcome
    }

    /// Full load protocol: pre-create, positional assignment, override.
    pub fn configure<H: NodeHost>(&mut self, saved: &[Value], host: &mut H) -> RestoreOutcome {
        let pending = self.before_apply(saved, host);
        self.widgets.assign_positional(saved);
        self.after_apply(pending, host)
    }

    fn shape_fields<H: NodeHost>(&mut self, count: usize, host: &mut H) {
        let mut changed = false;
        for slot in 0..count {
            let slot = SlotIndex::new(slot);
            if self.widgets.field(slot).is_none() {
                self.create_field(slot, host);
                changed = true;
            }
        }
        let stale = self
            .widgets
            .field_slots()
            .into_iter()
            .filter(|slot| slot.get() >= count)
            .collect::<Vec<_>>();
        for slot in stale.into_iter().rev() {
            changed |= self.teardown_field(slot, host);
        }
        if changed {
            self.structure_changed(host);
        } else {
            self.reorder();
        }
    }
}
