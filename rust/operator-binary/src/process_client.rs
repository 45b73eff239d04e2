//! Access to the runtime environment of a running FoundationDB Pod.
use std::collections::BTreeMap;

use snafu::{OptionExt, Snafu};

use crate::{
    config::{address, locality::Locality, ENV_POD_IP, ENV_PUBLIC_IP},
    crd::FoundationDBCluster,
};

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("environment variable {name:?} is not set for the process"))]
    MissingEnvironmentVariable { name: String },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Facts about where a Pod was scheduled, known only once it runs.
#[derive(Clone, Debug, Default)]
pub struct PodPlacement {
    pub pod_ip: String,
    pub service_ip: Option<String>,
    pub node_name: Option<String>,
    /// Additional environment of the main container, e.g. a zone variable.
    pub environment: BTreeMap<String, String>,
}

/// Reads environment values from the process a start command is built for.
pub trait ProcessClient {
    fn get_environment_value(&self, name: &str) -> Result<String>;
}

/// A [`ProcessClient`] backed by a fixed set of substitutions.
#[derive(Clone, Debug, Default)]
pub struct SubstitutionProcessClient {
    substitutions: BTreeMap<String, String>,
}

impl SubstitutionProcessClient {
    pub fn new(substitutions: BTreeMap<String, String>) -> Self {
        Self { substitutions }
    }

    /// The substitutions the Pod of `process_group_id` sees once it is placed.
    pub fn for_pod(
        cluster: &FoundationDBCluster,
        placement: &PodPlacement,
        process_group_id: &str,
    ) -> Self {
        let mut substitutions = placement.environment.clone();
        substitutions.extend(Locality::resolve(cluster, placement, process_group_id).environment());
        substitutions.insert(
            ENV_PUBLIC_IP.to_string(),
            address::public_ip(cluster, placement).to_string(),
        );
        substitutions.insert(ENV_POD_IP.to_string(), placement.pod_ip.clone());
        tracing::debug!(process_group_id, ?substitutions, "Resolved process substitutions");
        Self { substitutions }
    }
}

impl ProcessClient for SubstitutionProcessClient {
    fn get_environment_value(&self, name: &str) -> Result<String> {
        self.substitutions
            .get(name)
            .cloned()
            .context(MissingEnvironmentVariableSnafu { name })
    }
}
