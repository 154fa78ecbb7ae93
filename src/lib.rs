//! Keylint - message-key validator for JVM bytecode
//!
//! Keylint is a CLI tool and library for validating message keys in compiled
//! JVM classes against YAML message catalogs. A small abstract interpreter
//! proves which string arguments at configured call sites are compile-time
//! constants, extracts those keys, and diffs them against the declared keys
//! to report missing and unused ones.
//!
//! ## Module Structure
//!
//! - `analysis`: Constant-string abstract interpretation over decoded methods
//! - `bytecode`: Class file parsing and instruction decoding
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `extract`: Call-site matching and key extraction
//! - `issues`: Issue type definitions and reporting
//! - `messages`: Declared-key documents loaded from YAML
//! - `scanner`: Class file enumeration and the per-class pipeline
//! - `validate`: Declared-vs-extracted key diffing

pub mod analysis;
pub mod bytecode;
pub mod cli;
pub mod config;
pub mod extract;
pub mod issues;
pub mod messages;
pub mod scanner;
pub mod validate;
