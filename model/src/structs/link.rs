//! Provider/consumer link info (spec.md section 3 "Provider/Consumer Link
//! Info"), as resolved by the link resolver (spec.md section 4.5).

/// One provider, indexed from across every instance group, that a consumer
/// slot may resolve to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderInfo {
    /// The name other job references look this provider up by: its alias
    /// if one was declared, else its own name.
    pub export_name: String,
    pub link_type: String,
    pub instance_group: String,
    pub job: String,
    /// Property keys this provider exposes (spec.md section 3: "(for
    /// providers) the list of property keys the provider exposes").
    pub properties: Vec<String>,
}

/// What a single consumer slot resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConsumer {
    pub name: String,
    pub link_type: String,
    pub instance_group: String,
    pub job: String,
}

impl From<&ProviderInfo> for ResolvedConsumer {
    fn from(p: &ProviderInfo) -> Self {
        ResolvedConsumer {
            name: p.export_name.clone(),
            link_type: p.link_type.clone(),
            instance_group: p.instance_group.clone(),
            job: p.job.clone(),
        }
    }
}
