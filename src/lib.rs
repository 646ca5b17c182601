//! dtbuild: compiler for trading algorithm and indicator scripts.
//!
//! Hexagonal architecture: the compilation pipeline in [`domain`], port traits
//! in [`ports`], concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
