// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

macro_rules! handle_id {
    ($name:ident, $repr:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }
    };
}

handle_id!(NodeId, u64);
handle_id!(ElementId, u64);
handle_id!(SlotIndex, usize);

const FIELD_PREFIX: &str = "text_";

impl SlotIndex {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Widget name the host uses for this slot, e.g. `text_3`.
    pub fn widget_name(self) -> String {
        format!("{FIELD_PREFIX}{}", self.0)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
