// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod candidates;
pub mod fields;
pub mod ids;
pub mod join;
pub mod model;
pub mod node;
pub mod overlay;
pub mod payload;
pub mod session;
pub mod trigger;

pub use candidates::*;
pub use fields::*;
pub use ids::*;
pub use join::*;
pub use model::*;
pub use node::*;
pub use overlay::*;
pub use payload::*;
pub use session::*;
pub use trigger::*;
