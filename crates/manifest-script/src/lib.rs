// crates/manifest-script/src/lib.rs
// ============================================================================
// Module: Manifest Script Root
// Description: Public API surface for the restricted manifest-script dialect.
// Purpose: Wire together the lexer, parser, syntax tree, and interpreter.
// Dependencies: crate::{ast, error, eval, lexer, parser}
// ============================================================================

//! ## Overview
//! `manifest-script` executes script-shaped package manifests without a
//! general-purpose interpreter. Scripts are parsed into a closed syntax tree
//! and walked by an interpreter whose only capabilities are a specification
//! builder ([`SpecificationTarget`]) and an include resolver
//! ([`IncludeResolver`]), both supplied by the caller.
//!
//! ### Accepted shape
//!
//! ```text
//! require_relative "lib/example/version"
//!
//! Gem::Specification.new do |s|
//!   s.name    = "example"
//!   s.version = Example::VERSION
//!   s.add_runtime_dependency "rack", ">= 1.0", "< 3"
//! end
//! ```
//!
//! Text decoding happens before this crate is involved; sources arrive as
//! `&str`.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod ast;
pub mod error;
pub mod eval;
mod lexer;
pub mod parser;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ScriptError;
pub use error::ScriptErrorKind;
pub use error::ScriptResult;
pub use eval::IncludeKind;
pub use eval::IncludeRequest;
pub use eval::IncludeResolver;
pub use eval::MAX_INCLUDE_DEPTH;
pub use eval::NoIncludes;
pub use eval::ScriptOutcome;
pub use eval::SpecificationTarget;
pub use eval::TargetError;
pub use eval::Value;
pub use eval::evaluate;
pub use lexer::UNTERMINATED_STRING;
pub use parser::MAX_SCRIPT_INPUT_BYTES;
pub use parser::parse_program;
