//! Run spec: scaling, resources, probes and scheduling hints shared by an
//! instance group and, per-container, by its job references (spec.md
//! section 3 "Run spec").

/// When a job runs relative to the rest of the deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlightStage {
    PreFlight,
    Flight,
    PostFlight,
    Manual,
}

impl Default for FlightStage {
    fn default() -> Self {
        FlightStage::Flight
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scaling {
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub default: u32,
    #[serde(default)]
    pub ha: bool,
    #[serde(default)]
    pub must_be_odd: bool,
}

/// A resource request/limit pair in the encoder's unit of choice
/// (megabytes for memory, millicores for CPU); validated non-negative.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    #[serde(default)]
    pub request: i64,
    #[serde(default)]
    pub limit: i64,
}

/// A mounted scratch volume shared between a main group and its
/// co-located sidecars via a `tag` (spec.md section 4.6 "Co-located
/// containers").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    pub tag: String,
    pub path: String,
}

/// At most one of `url`/`command`/`port` may be set (spec.md section 4.6
/// "Health checks").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Probe {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Probe {
    pub fn set_count(&self) -> usize {
        [self.url.is_some(), self.command.is_some(), self.port.is_some()]
            .iter()
            .filter(|set| **set)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.set_count() == 0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    #[serde(default)]
    pub scaling: Scaling,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub memory: ResourceSpec,
    #[serde(default)]
    pub cpu: ResourceSpec,
    #[serde(default)]
    pub liveness: Option<Probe>,
    #[serde(default)]
    pub readiness: Option<Probe>,
    #[serde(default)]
    pub flight_stage: FlightStage,
    #[serde(default)]
    pub affinity: Option<serde_yaml::Value>,
    #[serde(default)]
    pub service_account: Option<String>,
    #[serde(default)]
    pub active_passive_probe: Option<Probe>,
    #[serde(default)]
    pub env_allow_list: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_rejects_more_than_one_source() {
        let probe = Probe { url: Some("/healthz".into()), port: Some(8080), command: None };
        assert_eq!(probe.set_count(), 2);
    }

    #[test]
    fn flight_stage_defaults_to_flight() {
        assert_eq!(FlightStage::default(), FlightStage::Flight);
    }
}
