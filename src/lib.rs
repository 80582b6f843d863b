//! # passage-chat
//!
//! A single-page chat and search front end for a remote passage service.
//! Queries go to a retrieval endpoint; in chat mode the retrieved passages
//! are folded into a prompt for a generation endpoint whose streamed answer
//! is decoded and appended to an in-memory transcript.
//!
//! ## One chat turn
//!
//! ```text
//!   query ──► validate ──► busy? ──yes──► Busy
//!                            │no
//!                            ▼
//!                 append { user, query }
//!                            │
//!                            ▼
//!              POST /api/search (query, key, n) ──fail──► RetrievalFailed
//!                            │ passages
//!                            ▼
//!                      build prompt
//!                            │
//!                            ▼
//!              POST /api/answer (prompt, key) ──fail──► GenerationFailed
//!                            │ byte stream
//!                            ▼
//!              incremental UTF-8 decode ──fail──► StreamReadFailed
//!                            │ full text
//!                            ▼
//!               append { assistant, text }
//! ```
//!
//! The busy flag is held for the whole turn and released on every exit path.
//! Failures after the user message is appended leave it in place and add no
//! assistant message.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the server and backend
//! - [`models`] - Messages, passages and the page's request/response types
//! - [`error`] - The turn failure taxonomy
//! - [`settings`] - Clamped user settings and their key-value persistence
//! - [`llm::transport`] - Retrieval and streamed generation over HTTP
//! - [`llm::stream_decoder`] - Chunk-boundary-safe decoding of the answer body
//! - [`chat`] - Conversation store, busy flag and the turn controller
//! - [`api`] - Axum routes for the page, transcript, queries, events and settings
//! - [`state`] - Shared application state

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod settings;
pub mod state;
