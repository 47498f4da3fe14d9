//! Session controller for the care assistant client.
//!
//! Owns the session state, sequences the chat client, the follow-up poller,
//! and the voice capture engine, and enforces that only one foreground
//! interaction is active at a time. The background poller is the only
//! operation permitted to append messages concurrently with a foreground
//! send or recording.

pub mod controller;
pub mod error;
pub mod mode;

pub use controller::{Notice, SessionController, SessionSnapshot};
pub use error::SessionError;
pub use mode::{InteractionMode, ModeMachine};
