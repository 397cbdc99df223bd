// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`) and built-in defaults
//!   (`defaults.rs`).
//! - Compile path specs and derive the project layout (`paths.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like disjoint destinations (`validate.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve};
pub use model::{
    ConfigFile, PathSpecConfig, ProjectSection, RawConfigFile, RuleConfig, ServeSection,
    StageConfig,
};
pub use paths::{Layout, PathSpec, PathTable};
