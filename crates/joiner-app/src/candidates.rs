// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::Result;

use crate::trigger::{MatchMode, TriggerKind};

pub const MAX_CANDIDATES: usize = 10;

/// Per-kind cache of completion candidates. Empty until populated; a failed
/// fetch leaves the kind empty so autocomplete simply offers nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSource {
    lists: BTreeMap<TriggerKind, Vec<String>>,
}

impl CandidateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the result of a fetch. Errors are logged and cached as an
    /// empty list.
    pub fn populate(&mut self, kind: TriggerKind, fetched: Result<Vec<String>>) -> usize {
        let values = match fetched {
            Ok(values) => values,
            Err(error) => {
                log::warn!("{} candidates unavailable: {error:#}", kind.as_str());
                Vec::new()
            }
        };
        let count = values.len();
        self.set(kind, values);
        count
    }

    pub fn set(&mut self, kind: TriggerKind, values: Vec<String>) {
        log::debug!("cached {} {} candidates", values.len(), kind.as_str());
        self.lists.insert(kind, values);
    }

    pub fn candidates(&self, kind: TriggerKind) -> &[String] {
        self.lists.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Case-insensitive match in cache order, capped at [`MAX_CANDIDATES`].
    pub fn filter(&self, kind: TriggerKind, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        let mode = kind.match_mode();
        self.candidates(kind)
            .iter()
            .filter(|candidate| {
                let haystack = candidate.to_lowercase();
                match mode {
                    MatchMode::Contains => haystack.contains(&needle),
                    MatchMode::Prefix => haystack.starts_with(&needle),
                }
            })
            .take(MAX_CANDIDATES)
            .cloned()
            .collect()
    }
}
