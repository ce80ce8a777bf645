//! artisan-lib: build, seal and execute deployment packages.
//!
//! This crate provides the pipeline behind the `art` CLI:
//! - `Manifest`: the `build.yaml` project description (profiles, functions, inputs)
//! - `Builder`: runs profiles and functions, packages and seals build targets
//! - `Seal`: digest and optional signature binding a package manifest to its archive
//! - `Registry`: local store of sealed packages with export, import and remote pull

pub mod archive;
pub mod build;
pub mod config;
pub mod consts;
pub mod env;
pub mod error;
pub mod execute;
pub mod input;
pub mod keys;
pub mod manifest;
pub mod placeholder;
pub mod platform;
pub mod registry;
pub mod seal;
pub mod source;
pub mod util;

pub use build::{BuildOutcome, BuildRequest, Builder, ExecuteRequest};
pub use config::Config;
pub use env::Environment;
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use registry::{Credentials, PackageName, Registry};
pub use seal::Seal;
pub use source::SourceRequest;
