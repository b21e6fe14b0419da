//! Domain model module declarations.

pub mod command;
pub mod envelope;
pub mod workflow;

pub use command::{Command, ExtraDatum, RestartInfo};
pub use envelope::Envelope;
pub use workflow::{ResponseKind, UpdateAction, UpdateStep};
