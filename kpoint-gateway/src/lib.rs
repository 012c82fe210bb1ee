//! kpoint-gateway: HTTP service over the extraction and retrieval pipeline.
//!
//! Owns the upstream completions client, the extraction client with its
//! fallback, chat reply scheduling, the remote tool-store mirror and the
//! axum router including the `/api/llm` proxy.

pub mod error;
pub mod extraction;
pub mod providers;
pub mod server;
pub mod state;
pub mod tool_dispatch;
