#![allow(renamed_and_removed_lints)]

#[macro_use]
extern crate serde_derive;
extern crate serde_yaml;
extern crate serde_json;
extern crate serde;

#[cfg(feature = "filesystem")]
extern crate walkdir;

#[cfg(feature = "filesystem")]
extern crate dirs;

#[macro_use]
extern crate log;

extern crate regex;

extern crate semver;
extern crate sha1;
extern crate tar;
extern crate flate2;
extern crate tempfile;

#[macro_use]
extern crate failure;

pub use failure::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub mod error;

/// Release, package and job entities owned by a loaded release.
pub mod release;

/// Reads release manifests and job/package archives off disk.
pub mod archive;

/// Keeps the set of releases a role manifest is allowed to reference.
pub mod registry;

/// Light/dark property override merging ("opinions").
pub mod opinions;

/// Structs that make up a parsed role manifest.
pub mod structs;

pub mod role_manifest;
pub use role_manifest::RoleManifest;

/// Resolves provider/consumer link declarations across instance groups.
pub mod links;

/// Accumulates validation failures across a role manifest.
pub mod validate;

/// Deterministic content fingerprinting for instance groups.
pub mod signature;

/// Extracts `((variable))` interpolation identifiers from job templates.
pub mod template;

/// Plain orchestration functions wiring the subsystems above together.
pub mod pipeline;
