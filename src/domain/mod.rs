//! Core domain types and logic.

pub mod bar;
pub mod timeline;
pub mod allocation;
pub mod indicator;
pub mod signal;
pub mod policy;
pub mod evaluator;
pub mod replay;
pub mod config_validation;
pub mod error;
