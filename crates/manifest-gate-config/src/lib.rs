// crates/manifest-gate-config/src/lib.rs
// ============================================================================
// Module: Manifest Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for manifest-gate.toml semantics.
// Dependencies: manifest-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `manifest-gate-config` defines the configuration model for Manifest Gate:
//! loader settings, the host runtime description, the project runtime
//! requirement, and the manifests and packages a `check` run covers.
//! Validation is strict and fails closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
