//! Validator (spec.md section 4.6).
//!
//! Runs the full invariant battery over a parsed, link-resolved role
//! manifest. Every failing check appends a [`ValidationError`]; nothing
//! here returns early; the whole batch is surfaced together as one
//! [`ValidationErrors`] (spec.md section 7 "the validator accumulates all
//! errors and reports them together").

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{Result, ValidationError, ValidationErrorKind, ValidationErrors};
use crate::registry::ReleaseRegistry;
use crate::role_manifest::RoleManifest;
use crate::structs::instance_group::{InstanceGroup, InstanceGroupType};
use crate::structs::run::{Probe, ResourceSpec};
use crate::template;

/// Tunables for checks that depend on external state the core only reads
/// (spec.md section 1 "on-disk cache ... the core only reads by SHA",
/// section 4.6 "Scripts").
#[derive(Clone, Debug, Default)]
pub struct ValidatorOptions {
    /// Directory holding non-absolute scripts referenced by instance
    /// groups, adjacent to the manifest on disk.
    pub scripts_dir: Option<PathBuf>,
    /// Caller opted out of "every script file discovered must be
    /// referenced" (spec.md section 4.6 "unless the caller opted out of
    /// strict checking").
    pub skip_unreferenced_script_check: bool,
}

struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    fn new() -> Self {
        Checker { errors: Vec::new() }
    }

    fn config(&mut self, path: impl Into<String>, value: impl Into<String>, detail: impl Into<String>) {
        self.errors.push(ValidationError::new(path, ValidationErrorKind::Config, format!("{}: {}", value.into(), detail.into())));
    }

    fn generic(&mut self, path: impl Into<String>, detail: impl Into<String>) {
        self.errors.push(ValidationError::new(path, ValidationErrorKind::Generic, detail));
    }

    fn duplicate_variable(&mut self, path: impl Into<String>, detail: impl Into<String>) {
        self.errors.push(ValidationError::new(path, ValidationErrorKind::DuplicateVariable, detail));
    }
}

/// Runs every check in spec.md section 4.6 and returns `Ok(())` iff none
/// failed, else an `Err` wrapping the full [`ValidationErrors`] batch.
pub fn validate(manifest: &RoleManifest, registry: &ReleaseRegistry, options: &ValidatorOptions) -> Result<()> {
    let mut checker = Checker::new();

    check_variables(manifest, &mut checker);
    check_templates(manifest, &mut checker);
    for group in &manifest.instance_groups {
        check_instance_group(group, &mut checker);
        check_health(group, &mut checker);
        check_tags(group, &mut checker);
        check_service_accounts(group, manifest, &mut checker);
        check_pod_security_policy(group, manifest, &mut checker);
    }
    check_colocated_containers(manifest, &mut checker);
    check_scripts(manifest, options, &mut checker);
    check_releases(manifest, registry, &mut checker);

    if checker.errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(checker.errors).into())
    }
}

/// Every release the manifest names must be loaded, and every job reference
/// must resolve to a concrete job within it (spec.md section 3 "Release
/// References", section 4.4).
fn check_releases(manifest: &RoleManifest, registry: &ReleaseRegistry, checker: &mut Checker) {
    for release_ref in &manifest.releases {
        if registry.get(&release_ref.name).is_err() {
            checker.generic("releases", format!("release '{}' is not loaded", release_ref.name));
        }
    }
    for group in &manifest.instance_groups {
        for job_ref in &group.jobs {
            let path = format!("instance_groups.{}.jobs.{}", group.name, job_ref.name);
            if registry.find_job(&job_ref.release, &job_ref.name).is_err() {
                checker.generic(&path, format!("no job '{}' in release '{}'", job_ref.name, job_ref.release));
            }
        }
    }
}

fn all_template_text(manifest: &RoleManifest) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in manifest.configuration.templates.iter() {
        if let Some(s) = value.as_str() {
            out.push((format!("configuration.templates.{}", key), s.to_string()));
        }
    }
    for group in &manifest.instance_groups {
        for (key, value) in group.configuration.iter() {
            if let Some(s) = value.as_str() {
                out.push((format!("instance_groups.{}.configuration.{}", group.name, key), s.to_string()));
            }
        }
    }
    out
}

fn check_variables(manifest: &RoleManifest, checker: &mut Checker) {
    let vars = &manifest.configuration.variables;

    // sorted, no duplicates
    let mut seen_names: BTreeSet<&str> = BTreeSet::new();
    for pair in vars.windows(2) {
        if pair[0].name >= pair[1].name {
            checker.duplicate_variable(
                "configuration.variables",
                format!("'{}' must sort strictly before '{}'", pair[0].name, pair[1].name),
            );
        }
    }
    for v in vars {
        if !seen_names.insert(&v.name) {
            checker.duplicate_variable(format!("configuration.variables.{}", v.name), "duplicate variable name");
        }
    }

    // previous_names collisions
    let mut all_previous: Vec<(&str, &str)> = Vec::new();
    for v in vars {
        for p in &v.previous_names {
            all_previous.push((v.name.as_str(), p.as_str()));
        }
    }
    for v in vars {
        if all_previous.iter().any(|(_, p)| *p == v.name) {
            checker.generic(format!("configuration.variables.{}", v.name), "previous_names collides with a current variable name");
        }
    }
    for i in 0..all_previous.len() {
        for j in (i + 1)..all_previous.len() {
            if all_previous[i].1 == all_previous[j].1 {
                checker.generic(
                    format!("configuration.variables.{}.previous_names", all_previous[i].0),
                    format!("previous_name '{}' also claimed by '{}'", all_previous[i].1, all_previous[j].0),
                );
            }
        }
    }

    // scope/internal conflict
    for v in vars {
        if v.has_environment_internal_conflict() {
            checker.generic(format!("configuration.variables.{}.scope", v.name), "environment scope conflicts with internal=true");
        }
        if v.description.trim().is_empty() {
            checker.generic(format!("configuration.variables.{}.description", v.name), "description must not be empty");
        }
    }

    // usage
    let used: BTreeSet<String> = all_template_text(manifest)
        .iter()
        .flat_map(|(_, text)| template::extract_variables(text))
        .collect();
    for v in vars {
        if !v.internal && !used.contains(&v.name) {
            checker.generic(format!("configuration.variables.{}", v.name), "variable is neither internal nor used in any template");
        }
    }
}

fn check_templates(manifest: &RoleManifest, checker: &mut Checker) {
    let declared: BTreeSet<&str> = manifest.configuration.variables.iter().map(|v| v.name.as_str()).collect();

    for (key, value) in manifest.configuration.templates.raw_iter() {
        if key.as_str().is_none() {
            checker.generic("configuration.templates", "template keys must be strings");
        }
        if value.as_str().is_none() {
            checker.generic(format!("configuration.templates.{:?}", key), "template values must be strings");
        }
    }
    for group in &manifest.instance_groups {
        for (key, value) in group.configuration.raw_iter() {
            if key.as_str().is_none() {
                checker.generic(format!("instance_groups.{}.configuration", group.name), "template keys must be strings");
            }
            if value.as_str().is_none() {
                checker.generic(format!("instance_groups.{}.configuration.{:?}", group.name, key), "template values must be strings");
            }
        }
    }

    for (path, text) in &manifest.configuration.templates.iter().filter_map(|(k, v)| v.as_str().map(|s| (k, s))).collect::<Vec<_>>() {
        if template::is_constant(text) {
            checker.generic(format!("configuration.templates.{}", path), "global template must interpolate at least one variable");
        }
        for var in template::extract_variables(text) {
            if !declared.contains(var.as_str()) {
                checker.generic(format!("configuration.templates.{}", path), format!("references undeclared variable '{}'", var));
            }
        }
    }
    for group in &manifest.instance_groups {
        for (key, text) in group.configuration.iter().filter_map(|(k, v)| v.as_str().map(|s| (k, s))) {
            for var in template::extract_variables(text) {
                if !declared.contains(var.as_str()) {
                    checker.generic(
                        format!("instance_groups.{}.configuration.{}", group.name, key),
                        format!("references undeclared variable '{}'", var),
                    );
                }
            }
        }
    }
}

fn check_resource_spec(path: &str, resources: &ResourceSpec, checker: &mut Checker) {
    if resources.request < 0 {
        checker.config(format!("{}.request", path), resources.request.to_string(), "must be non-negative");
    }
    if resources.limit < 0 {
        checker.config(format!("{}.limit", path), resources.limit.to_string(), "must be non-negative");
    }
}

fn check_port_name(path: &str, name: &str, user_configurable: bool, checker: &mut Checker) {
    let limit = if user_configurable { 9 } else { 15 };
    let valid_chars = !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_chars || name.len() > limit {
        checker.config(format!("{}.name", path), name, format!("must be lowercase hyphen-separated, <= {} chars", limit));
    }
}

fn check_instance_group(group: &InstanceGroup, checker: &mut Checker) {
    let path = format!("instance_groups.{}", group.name);
    check_resource_spec(&format!("{}.run.memory", path), &group.run.memory, checker);
    check_resource_spec(&format!("{}.run.cpu", path), &group.run.cpu, checker);

    for job_ref in &group.jobs {
        let jpath = format!("{}.jobs.{}", path, job_ref.name);
        check_resource_spec(&format!("{}.properties.run.memory", jpath), &job_ref.properties.run.memory, checker);
        check_resource_spec(&format!("{}.properties.run.cpu", jpath), &job_ref.properties.run.cpu, checker);

        let mut seen_names: BTreeSet<&str> = BTreeSet::new();
        for port in &job_ref.properties.ports {
            let ppath = format!("{}.properties.ports.{}", jpath, port.name);
            check_port_name(&ppath, &port.name, port.user_configurable, checker);
            if !seen_names.insert(&port.name) {
                checker.generic(&ppath, "duplicate port name within this job reference");
            }
            for bound in &[port.internal, port.external] {
                if *bound == 0 || *bound > 65535 {
                    checker.config(format!("{}.range", ppath), bound.to_string(), "must be within 1..65535");
                }
            }
            let width = port.max.saturating_sub(port.internal).saturating_add(1);
            if port.count > width && port.max >= port.internal {
                checker.config(format!("{}.count", ppath), port.count.to_string(), "inconsistent with the declared port range width");
            }
            if port.count > port.max {
                checker.config(format!("{}.count", ppath), port.count.to_string(), "count must not exceed max");
            }
            if port.internal_range.is_some() || port.external_range.is_some() {
                checker.generic(format!("{}.range", ppath), "legacy range fields must be cleared by normalization before validation");
            }
        }
    }
}

fn check_health(group: &InstanceGroup, checker: &mut Checker) {
    let path = format!("instance_groups.{}.run", group.name);
    let probes: [(&str, &Option<Probe>); 3] =
        [("liveness", &group.run.liveness), ("readiness", &group.run.readiness), ("active_passive_probe", &group.run.active_passive_probe)];
    for (label, probe) in &probes {
        if let Some(p) = probe {
            if p.set_count() > 1 {
                checker.generic(format!("{}.{}", path, label), "at most one of url/command/port may be set");
            }
        }
    }
    if let Some(p) = &group.run.liveness {
        if let Some(cmd) = &p.command {
            if cmd.len() > 1 {
                checker.generic(format!("{}.liveness.command", path), "liveness command may have at most one entry");
            }
        }
    }

    let has_probe = group.run.liveness.as_ref().map_or(false, |p| !p.is_empty())
        || group.run.readiness.as_ref().map_or(false, |p| !p.is_empty());
    match group.group_type {
        InstanceGroupType::ActiveLongRunning if !has_probe => {
            checker.generic(&path, "active-long-running instance groups require a health probe");
        }
        InstanceGroupType::OneShotTask if has_probe => {
            checker.generic(&path, "one-shot-task instance groups must not declare health probes");
        }
        _ => {}
    }
}

fn check_tags(group: &InstanceGroup, checker: &mut Checker) {
    let path = format!("instance_groups.{}.tags", group.name);
    for tag in &group.tags {
        if !tag.acceptable_group_types().contains(&group.group_type) {
            checker.config(&path, tag.as_str(), format!("not valid on a {:?} instance group", group.group_type));
        }
        if tag.requires_active_passive_probe() {
            let probe_ok = group.run.active_passive_probe.as_ref().map_or(false, |p| !p.is_empty());
            if !probe_ok {
                checker.generic(&path, "active-passive tag requires a non-empty active_passive_probe");
            }
        }
    }
}

fn check_service_accounts(group: &InstanceGroup, manifest: &RoleManifest, checker: &mut Checker) {
    let auth = &manifest.configuration.auth;
    let mut check_one = |label: &str, account_name: &str, checker: &mut Checker| {
        match auth.find_account(account_name) {
            None => checker.generic(label, format!("service account '{}' does not exist", account_name)),
            Some(account) => {
                for role in &account.roles {
                    if !auth.role_exists(role) {
                        checker.generic(format!("{}.roles", label), format!("role '{}' does not exist", role));
                    }
                }
            }
        }
    };
    if let Some(sa) = &group.run.service_account {
        check_one(&format!("instance_groups.{}.run.service_account", group.name), sa, checker);
    }
    for job_ref in &group.jobs {
        if let Some(sa) = &job_ref.properties.service_account {
            check_one(&format!("instance_groups.{}.jobs.{}.properties.service_account", group.name, job_ref.name), sa, checker);
        }
    }
}

fn check_pod_security_policy(group: &InstanceGroup, manifest: &RoleManifest, checker: &mut Checker) {
    for job_ref in &group.jobs {
        if let Some(psp) = &job_ref.properties.pod_security_policy {
            if !manifest.configuration.auth.is_known_pod_security_policy(psp) {
                checker.config(
                    format!("instance_groups.{}.jobs.{}.properties.pod_security_policy", group.name, job_ref.name),
                    psp,
                    "not one of the known pod security policy names",
                );
            }
        }
    }
}

fn check_colocated_containers(manifest: &RoleManifest, checker: &mut Checker) {
    let mut used_as_sidecar: BTreeSet<&str> = BTreeSet::new();
    for group in &manifest.instance_groups {
        if let Some(names) = &group.colocated_instance_groups {
            for name in names {
                used_as_sidecar.insert(name.as_str());
            }
        }
    }
    for group in &manifest.instance_groups {
        if group.group_type == InstanceGroupType::CoLocatedSidecar && !used_as_sidecar.contains(group.name.as_str()) {
            checker.generic(
                format!("instance_groups.{}", group.name),
                "co-located-sidecar instance group is not referenced by any main group",
            );
        }
    }

    for group in &manifest.instance_groups {
        let names = match &group.colocated_instance_groups {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };
        let path = format!("instance_groups.{}.colocated_instance_groups", group.name);

        let mut sidecars: Vec<&InstanceGroup> = Vec::new();
        for name in names {
            match manifest.find_instance_group(name) {
                None => checker.generic(&path, format!("'{}' does not name an instance group", name)),
                Some(sidecar) if sidecar.group_type != InstanceGroupType::CoLocatedSidecar => {
                    checker.generic(&path, format!("'{}' is not a co-located-sidecar instance group", name))
                }
                Some(sidecar) => sidecars.push(sidecar),
            }
        }

        // port collisions, union-unique across the main group and every
        // sidecar (spec.md section 9 open question, resolved to the
        // stricter rule).
        let mut seen: BTreeSet<(String, u32)> = BTreeSet::new();
        for port in group.own_ports().into_iter().chain(sidecars.iter().flat_map(|s| s.own_ports())) {
            let key = (format!("{:?}", port.protocol), port.external);
            if !seen.insert(key) {
                checker.generic(&path, format!("port {} collides across the main group and its sidecars", port.external));
            }
        }

        // emptyDir volume tags: every tag any sidecar mounts must match a
        // tag+path declared on the main group, and every sidecar must
        // mount every such tag.
        let main_volumes = &group.run.volumes;
        let mut sidecar_tags: BTreeSet<&str> = BTreeSet::new();
        for sidecar in &sidecars {
            for vol in &sidecar.run.volumes {
                sidecar_tags.insert(vol.tag.as_str());
                match main_volumes.iter().find(|v| v.tag == vol.tag) {
                    Some(main_vol) if main_vol.path == vol.path => {}
                    Some(_) => checker.generic(&path, format!("volume tag '{}' has a different path on the main group", vol.tag)),
                    None => checker.generic(&path, format!("volume tag '{}' is not declared on the main group", vol.tag)),
                }
            }
        }
        for tag in &sidecar_tags {
            for sidecar in &sidecars {
                if !sidecar.run.volumes.iter().any(|v| v.tag == *tag) {
                    checker.generic(&path, format!("sidecar '{}' does not mount shared volume tag '{}'", sidecar.name, tag));
                }
            }
        }
    }
}

#[cfg(feature = "filesystem")]
fn discover_scripts(dir: &std::path::Path) -> Vec<String> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(|p| p.to_string_lossy().into_owned()))
        .collect()
}

#[cfg(not(feature = "filesystem"))]
fn discover_scripts(_dir: &std::path::Path) -> Vec<String> {
    Vec::new()
}

fn check_scripts(manifest: &RoleManifest, options: &ValidatorOptions, checker: &mut Checker) {
    let referenced: BTreeSet<&str> = manifest.instance_groups.iter().flat_map(|g| g.scripts.iter().map(String::as_str)).collect();

    for group in &manifest.instance_groups {
        for script in &group.scripts {
            let path = std::path::Path::new(script);
            if path.is_absolute() {
                continue;
            }
            if let Some(dir) = &options.scripts_dir {
                if !dir.join(script).exists() {
                    checker.generic(
                        format!("instance_groups.{}.scripts", group.name),
                        format!("script '{}' not found under {}", script, dir.display()),
                    );
                }
            }
        }
    }

    if options.skip_unreferenced_script_check {
        return;
    }
    if let Some(dir) = &options.scripts_dir {
        for found in discover_scripts(dir) {
            if !referenced.contains(found.as_str()) {
                checker.generic("scripts", format!("script '{}' is not referenced by any instance group", found));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::configuration::{GlobalConfiguration, TemplateSet};
    use crate::structs::variable::VariableDeclaration;
    use serde_yaml::Value;

    fn manifest_with_variables(vars: Vec<VariableDeclaration>) -> RoleManifest {
        RoleManifest {
            instance_groups: Vec::new(),
            configuration: GlobalConfiguration { templates: TemplateSet::default(), variables: vars, auth: Default::default() },
            releases: Vec::new(),
        }
    }

    #[test]
    fn detects_unsorted_variables() {
        let vars = vec![
            VariableDeclaration { name: "zzz".into(), description: "d".into(), internal: true, ..Default::default() },
            VariableDeclaration { name: "aaa".into(), description: "d".into(), internal: true, ..Default::default() },
        ];
        let manifest = manifest_with_variables(vars);
        let registry = ReleaseRegistry::new();
        let err = validate(&manifest, &registry, &ValidatorOptions::default()).unwrap_err();
        assert!(err.to_string().contains("must sort strictly before"));
    }

    #[test]
    fn flags_unused_non_internal_variable() {
        let vars = vec![VariableDeclaration { name: "unused".into(), description: "d".into(), internal: false, ..Default::default() }];
        let manifest = manifest_with_variables(vars);
        let registry = ReleaseRegistry::new();
        let err = validate(&manifest, &registry, &ValidatorOptions::default()).unwrap_err();
        assert!(err.to_string().contains("neither internal nor used"));
    }

    #[test]
    fn accepts_used_sorted_variables() {
        let mut templates = TemplateSet::default();
        templates.entries.insert(Value::String("greeting".into()), Value::String("((used))".into()));
        let vars = vec![VariableDeclaration { name: "used".into(), description: "d".into(), internal: false, ..Default::default() }];
        let manifest = RoleManifest {
            instance_groups: Vec::new(),
            configuration: GlobalConfiguration { templates, variables: vars, auth: Default::default() },
            releases: Vec::new(),
        };
        let registry = ReleaseRegistry::new();
        assert!(validate(&manifest, &registry, &ValidatorOptions::default()).is_ok());
    }
}
