//! WebSocket protocol message types.
//!
//! This module defines the JSON envelopes exchanged with the frame server.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Outbound::Frame`] | Client → Server | One live-stream frame |
//! | [`Outbound::Image`] | Client → Server | One-shot image |
//! | [`Inbound::Confirmation`] | Server → Client | Image stored |
//! | [`Inbound::Success`] | Server → Client | Navigational instruction(s) |
//! | [`Inbound::ProcessedFrame`] | Server → Client | Processed preview frame |
//! | [`Inbound::Error`] | Server → Client | Server-side failure |
//!
//! Every envelope is keyed by its `type` field. Images always travel as
//! `data:image/jpeg;base64,` URIs.

// ============================================================================
// Submodules
// ============================================================================

/// Server → client envelopes.
pub mod inbound;

/// Client → server envelopes.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{Inbound, Instruction, InstructionPayload};
pub use outbound::{DataUri, JPEG_DATA_URI_PREFIX, Outbound, now_ms};
