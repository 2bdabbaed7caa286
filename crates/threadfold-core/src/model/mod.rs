//! Records exchanged with the conversation API.

pub mod status;

pub use status::{Account, Status};
