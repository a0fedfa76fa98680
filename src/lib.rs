//! Vigil - heuristic web target probe
//!
//! Checks a single URL for a handful of superficial security signals: missing
//! hardening headers, reachable common ports, HTML forms, and naive reflection
//! of a script payload through query parameters. Results are heuristic signals,
//! not confirmed vulnerabilities.

pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod models;
pub mod report;
pub mod scanner;
pub mod target;
