//! Structs that make up a parsed role manifest (spec.md section 3).
//!
//! Each submodule owns one entity family, mirroring the teacher's
//! `shipcat_definitions::structs` split (one file per concern rather than
//! one monolithic manifest module).

pub mod port;
pub use port::{Port, Protocol};

pub mod run;
pub use run::{FlightStage, Probe, ResourceSpec, RunSpec, Scaling, Volume};

pub mod tags;
pub use tags::Tag;

pub mod variable;
pub use variable::{GenerationType, ScopeType, VariableDeclaration};

pub mod instance_group;
pub use instance_group::{
    ContainerProperties, ExportedProvider, InstanceGroup, InstanceGroupType, JobReference,
};

pub mod auth;
pub use auth::{Account, AuthConfig, ClusterRole, Role};

pub mod configuration;
pub use configuration::{GlobalConfiguration, ReleaseReference, TemplateSet};

pub mod link;
pub use link::{ProviderInfo, ResolvedConsumer};
