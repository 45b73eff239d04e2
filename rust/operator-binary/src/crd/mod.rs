pub mod version;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackable_operator::{
    kube::{CustomResource, ResourceExt},
    schemars::{self, JsonSchema},
};
use strum::{Display, EnumIter, EnumString};

pub const APP_NAME: &str = "foundationdb";

/// Fault domain key that disables host-level replication.
pub const FAULT_DOMAIN_KEY_NONE: &str = "foundationdb.org/none";
/// Fault domain key used to spread a database over several Kubernetes clusters.
pub const FAULT_DOMAIN_KEY_KUBERNETES_CLUSTER: &str = "foundationdb.org/kubernetes-cluster";
pub const FAULT_DOMAIN_KEY_HOSTNAME: &str = "kubernetes.io/hostname";
pub const FAULT_DOMAIN_VALUE_FROM_NODE_NAME: &str = "spec.nodeName";

/// A FoundationDB cluster managed by the operator.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "apps.foundationdb.org",
    version = "v1beta1",
    kind = "FoundationDBCluster",
    shortname = "fdb",
    status = "FoundationDBClusterStatus",
    namespaced,
    crates(
        kube_core = "stackable_operator::kube::core",
        k8s_openapi = "stackable_operator::k8s_openapi",
        schemars = "stackable_operator::schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct FoundationDBClusterSpec {
    /// The version of FoundationDB the cluster should run, e.g. `6.2.20`.
    pub version: String,

    /// Settings per process class. The `general` entry applies to every class that has no
    /// entry of its own.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub processes: BTreeMap<ProcessClass, ProcessSettings>,

    #[serde(default)]
    pub fault_domain: FaultDomain,

    #[serde(default)]
    pub main_container: MainContainer,

    /// Use the unified image that bundles the monitor and the server binaries.
    /// Defaults to the split image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_unified_image: Option<bool>,

    /// Log group passed to every process. Defaults to the cluster name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hall: Option<String>,

    /// Prefix for the process group IDs, e.g. `dc1` results in `dc1-storage-1`.
    #[serde(
        default,
        rename = "processGroupIDPrefix",
        skip_serializing_if = "Option::is_none"
    )]
    pub process_group_id_prefix: Option<String>,

    #[serde(default)]
    pub routing: RoutingConfig,

    /// Number of storage server processes running in a single Pod. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_servers_per_pod: Option<u16>,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessClass {
    General,
    Storage,
    Log,
    Transaction,
    Stateless,
    ClusterController,
    Coordinator,
    Proxy,
    CommitProxy,
    GrvProxy,
    Resolution,
    Master,
    Test,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSettings {
    /// Extra knobs passed to fdbserver, e.g. `knob_disable_posix_kernel_aio = 1`.
    /// A list on a specific process class replaces the `general` list entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<Vec<String>>,
}

/// Describes how processes are grouped for replica placement.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// A fixed zone ID, used together with `foundationdb.org/kubernetes-cluster`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Where the zone ID comes from. `$VARIABLE` reads it from an environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<String>,
}

impl FaultDomain {
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(FAULT_DOMAIN_KEY_HOSTNAME)
    }

    /// The environment variable holding the zone ID, if `valueFrom` names one.
    pub fn zone_variable(&self) -> Option<&str> {
        self.value_from.as_deref()?.strip_prefix('$')
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainContainer {
    #[serde(default, rename = "enableTLS")]
    pub enable_tls: bool,

    /// Rules passed to `--tls_verify_peers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_verification_rules: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    #[serde(
        default,
        rename = "publicIPSource",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_source: Option<PublicIpSource>,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PublicIpSource {
    /// Processes advertise the IP of their Pod.
    #[default]
    Pod,
    /// Processes advertise the IP of a per-Pod Service and listen on the Pod IP.
    Service,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundationDBClusterStatus {
    /// The connection string of the running database. Empty until the database is configured.
    #[serde(default)]
    pub connection_string: String,

    #[serde(default)]
    pub required_addresses: RequiredAddressSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_version: Option<String>,

    /// Whether every Pod has the `FDB_POD_IP` environment variable.
    #[serde(default, rename = "hasListenIPsForAllPods")]
    pub has_listen_ips_for_all_pods: bool,
}

/// The address families processes have to listen on. Both are set while TLS is being
/// switched on or off.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredAddressSet {
    #[serde(default, rename = "tls")]
    pub tls: bool,

    #[serde(default, rename = "nonTLS")]
    pub non_tls: bool,
}

impl FoundationDBCluster {
    pub fn log_group(&self) -> String {
        self.spec
            .log_group
            .clone()
            .unwrap_or_else(|| self.name_any())
    }

    pub fn use_unified_image(&self) -> bool {
        self.spec.use_unified_image.unwrap_or(false)
    }

    pub fn public_ip_source(&self) -> PublicIpSource {
        self.spec.routing.public_ip_source.unwrap_or_default()
    }

    pub fn connection_string(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.connection_string.as_str())
            .unwrap_or_default()
    }

    pub fn required_addresses(&self) -> RequiredAddressSet {
        self.status
            .as_ref()
            .map(|status| status.required_addresses.clone())
            .unwrap_or_default()
    }

    pub fn has_listen_ips_for_all_pods(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.has_listen_ips_for_all_pods)
    }

    /// The version the processes are running, or the desired version before the first rollout.
    pub fn running_version(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|status| status.running_version.as_deref())
            .filter(|version| !version.is_empty())
            .unwrap_or(&self.spec.version)
    }

    /// The number of processes of a class that share one Pod.
    pub fn processes_per_pod(&self, process_class: ProcessClass) -> u16 {
        match process_class {
            ProcessClass::Storage => self.spec.storage_servers_per_pod.unwrap_or(1).max(1),
            _ => 1,
        }
    }

    /// The stable identifier of a process group, independent of the Pod IP.
    pub fn process_group_id(&self, process_class: ProcessClass, id: u32) -> String {
        match &self.spec.process_group_id_prefix {
            Some(prefix) => format!("{prefix}-{process_class}-{id}"),
            None => format!("{process_class}-{id}"),
        }
    }

    /// The process classes a configuration is rendered for: the stateful defaults plus every
    /// class that has explicit settings.
    pub fn process_classes(&self) -> Vec<ProcessClass> {
        let mut classes = vec![
            ProcessClass::Storage,
            ProcessClass::Log,
            ProcessClass::Stateless,
        ];
        for process_class in self.spec.processes.keys() {
            if *process_class != ProcessClass::General && !classes.contains(process_class) {
                classes.push(*process_class);
            }
        }
        classes
    }
}
