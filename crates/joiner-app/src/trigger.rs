// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKind {
    Wildcard,
    Preset,
}

impl TriggerKind {
    /// Declaration order; earlier kinds win ties.
    pub const ALL: [Self; 2] = [Self::Wildcard, Self::Preset];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wildcard => "wildcard",
            Self::Preset => "preset",
        }
    }

    pub const fn match_mode(self) -> MatchMode {
        match self {
            Self::Wildcard => MatchMode::Contains,
            Self::Preset => MatchMode::Prefix,
        }
    }

    pub const fn closer(self) -> ClosingDelimiter {
        match self {
            Self::Wildcard => ClosingDelimiter {
                text: "__",
                allow_leading_spaces: false,
            },
            Self::Preset => ClosingDelimiter {
                text: "*/",
                allow_leading_spaces: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Contains,
    Prefix,
}

/// Delimiter that ends a completed marker. When the text after the cursor
/// already starts with it, a commit consumes it instead of duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingDelimiter {
    pub text: &'static str,
    pub allow_leading_spaces: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRule {
    pub kind: TriggerKind,
    pub marker: &'static str,
    pub lookback: usize,
}

impl TriggerRule {
    pub const fn for_kind(kind: TriggerKind) -> Self {
        match kind {
            TriggerKind::Wildcard => Self {
                kind,
                marker: "__",
                lookback: 50,
            },
            TriggerKind::Preset => Self {
                kind,
                marker: "/*",
                lookback: 20,
            },
        }
    }

    pub const fn with_lookback(self, lookback: usize) -> Self {
        Self { lookback, ..self }
    }
}

/// Where a completion would be inserted: `start..end` in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSpan {
    pub kind: TriggerKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub kind: TriggerKind,
    pub start: usize,
    pub query: String,
}

impl TriggerMatch {
    pub fn span(&self) -> TriggerSpan {
        TriggerSpan {
            kind: self.kind,
            start: self.start,
            end: self.start + self.query.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerScanner {
    rules: Vec<TriggerRule>,
}

impl Default for TriggerScanner {
    fn default() -> Self {
        Self::new(TriggerKind::ALL.map(TriggerRule::for_kind).to_vec())
    }
}

impl TriggerScanner {
    /// Rules are kept in the given order, which is the tie-break priority.
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Finds the eligible marker nearest before `cursor`. A marker is
    /// eligible when fewer than `lookback` characters separate its start from
    /// the cursor.
    pub fn scan(&self, text: &str, cursor: usize) -> Option<TriggerMatch> {
        let cursor = floor_char_boundary(text, cursor);
        let head = &text[..cursor];

        let mut best: Option<(usize, TriggerKind)> = None;
        for rule in &self.rules {
            if rule.marker.is_empty() {
                continue;
            }
            let Some(start) = head.rfind(rule.marker) else {
                continue;
            };
            let distance = head[start..].chars().count();
            if distance >= rule.lookback {
                continue;
            }
            if best.is_none_or(|(best_start, _)| start > best_start) {
                best = Some((start, rule.kind));
            }
        }

        best.map(|(start, kind)| TriggerMatch {
            kind,
            start,
            query: head[start..].to_owned(),
        })
    }
}

/// Largest char boundary at or below `index`, clamped to the text length.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
