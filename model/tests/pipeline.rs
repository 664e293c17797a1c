//! Cross-module pipeline integration test: parse -> resolve -> validate ->
//! fingerprint -> render, exercised end to end the way an external command
//! layer would drive `pipeline`'s public functions (spec.md section 6).

use std::path::PathBuf;

use roleforge_model::opinions::Opinions;
use roleforge_model::pipeline;
use roleforge_model::registry::ReleaseRegistry;
use roleforge_model::release::{ConsumerDecl, Job, JobProperty, ProviderDecl, Release};
use roleforge_model::signature::SignatureOptions;
use roleforge_model::validate::ValidatorOptions;
use serde_yaml::Value;

const MANIFEST: &str = r#"
instance_groups:
  - name: db
    jobs:
      - name: postgres
        release: core
  - name: api
    jobs:
      - name: server
        release: core
        properties:
          ports:
            - name: http
              internal: 8080
releases:
  - name: core
    version: "1.0"
"#;

fn core_release() -> Release {
    let postgres = Job {
        name: "postgres".into(),
        description: "a database".into(),
        fingerprint: "fp-postgres".into(),
        sha1: "sha-postgres".into(),
        archive_path: PathBuf::from("/tmp/postgres.tgz"),
        templates: Vec::new(),
        properties: Vec::new(),
        package_names: Vec::new(),
        providers: vec![ProviderDecl { name: "database".into(), link_type: "db".into(), properties: vec!["host".into(), "port".into()] }],
        consumers: Vec::new(),
    };
    let server = Job {
        name: "server".into(),
        description: "an api server".into(),
        fingerprint: "fp-server".into(),
        sha1: "sha-server".into(),
        archive_path: PathBuf::from("/tmp/server.tgz"),
        templates: Vec::new(),
        properties: vec![JobProperty { name: "port".into(), description: String::new(), default: Value::String("8080".into()) }],
        package_names: Vec::new(),
        providers: Vec::new(),
        consumers: vec![ConsumerDecl { name: "database".into(), link_type: "db".into(), optional: false }],
    };
    Release::new("core", "1.0", "deadbeef", false, false, PathBuf::from("/tmp/core"), vec![postgres, server], Vec::new())
}

#[test]
fn full_pipeline_parses_resolves_validates_fingerprints_and_renders() {
    let mut registry = ReleaseRegistry::new();
    registry.insert(core_release()).unwrap();

    let mut manifest = pipeline::build_role_manifest(MANIFEST).unwrap();

    pipeline::resolve_and_validate(&mut manifest, &registry, &ValidatorOptions::default()).unwrap();

    let api_group = manifest.find_instance_group("api").unwrap();
    let server_ref = &api_group.jobs[0];
    let link = server_ref.resolved_consumers.get("database").unwrap();
    assert_eq!(link.instance_group, "db");
    assert_eq!(link.job, "postgres");

    // port normalization ran during parsing: external defaults to internal,
    // count/max default to 1.
    let port = &server_ref.properties.ports[0];
    assert_eq!(port.external, 8080);
    assert_eq!(port.count, 1);
    assert_eq!(port.max, 1);

    let opinions = Opinions::empty();
    let options = SignatureOptions { tooling_version: "1.2.3".into(), extra_tag: "test".into() };
    let fp1 = pipeline::fingerprint_instance_group(api_group, &registry, &opinions, None, &options).unwrap();
    let fp2 = pipeline::fingerprint_instance_group(api_group, &registry, &opinions, None, &options).unwrap();
    assert_eq!(fp1, fp2, "fingerprinting the same instance group twice must be deterministic");

    let db_group = manifest.find_instance_group("db").unwrap();
    let fp_db = pipeline::fingerprint_instance_group(db_group, &registry, &opinions, None, &options).unwrap();
    assert_ne!(fp1, fp_db, "distinct instance groups must fingerprint differently");

    let rendered = pipeline::render_instance_group(api_group, &registry, &opinions).unwrap();
    assert!(rendered.starts_with("---\n"));
    assert!(rendered.contains("server:"));
    assert!(rendered.contains("port: 8080"));
}

#[test]
fn invalid_manifest_is_rejected_with_accumulated_errors() {
    let mut registry = ReleaseRegistry::new();
    registry.insert(core_release()).unwrap();

    // "app" references a release that was never loaded, and its consumer
    // has no matching provider anywhere in the manifest.
    let text = r#"
instance_groups:
  - name: app
    jobs:
      - name: server
        release: missing
releases:
  - name: missing
    version: "1.0"
"#;
    let mut manifest = pipeline::build_role_manifest(text).unwrap();
    let err = pipeline::resolve_and_validate(&mut manifest, &registry, &ValidatorOptions::default()).unwrap_err();
    assert!(err.to_string().contains("missing"));
}
