//! HTTP client module for Vigil

pub mod client;
pub use client::{FetchedPage, HttpClient};
