//! Chat transport for the care assistant server.
//!
//! Provides the request/response client for greetings and user messages,
//! the follow-up poller that discovers agent-initiated messages, and the
//! wire types shared by both. A mock client lives alongside the trait for
//! testing without a server.

pub mod client;
pub mod poller;
pub mod wire;

pub use client::{AssistantClient, HttpAssistantClient, MockAssistantClient};
pub use poller::FollowupPoller;
pub use wire::{ChatReply, ChatRequest, FollowupReply, FollowupRequest};
