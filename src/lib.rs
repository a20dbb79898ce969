//! Cold-outreach pipeline: prospect import, a fixed three-email sequence,
//! funnel tracking from webhooks, and the HTTP/MCP surfaces over them.

pub mod api;
pub mod config;
pub mod import;
pub mod mail;
pub mod mcp;
pub mod sequencer;
pub mod templates;
pub mod webhooks;
