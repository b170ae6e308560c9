//! Small helpers shared across modules.

pub mod mime;
pub mod path;
pub mod plural;
