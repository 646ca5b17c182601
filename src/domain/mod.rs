//! Compilation pipeline: preprocess, lex, parse, generate, compose.

pub mod action;
pub mod config_validation;
pub mod dependency;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod lexer;
pub mod orchestrator;
pub mod parser;
pub mod preprocessor;
pub mod template;
pub mod token;
pub mod tree;
