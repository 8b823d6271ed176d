//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`quadkey`] - Quadkey utilities (encode, decode, neighbors, span, chain)
//! - [`config`] - Configuration management (init, show, path)
//! - [`track`] - Drive the subscription manager along a path

pub mod common;
pub mod config;
pub mod quadkey;
pub mod track;
