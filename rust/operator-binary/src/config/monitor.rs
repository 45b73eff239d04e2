use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    config::{
        address::{AddressSpec, AddressStyle},
        argument::Argument,
        flag, locality, parameters, server_binary_path, InvalidProcessCountSnafu, Result,
        CLASS_FLAG, CLUSTER_FILE_FLAG, CLUSTER_FILE_PATH, DATA_DIRECTORY, DATA_DIRECTORY_FLAG,
        LOG_DIRECTORY, LOG_DIRECTORY_FLAG, LOG_GROUP_FLAG, SEED_CLUSTER_FILE_FLAG,
        SEED_CLUSTER_FILE_PATH, TLS_VERIFY_PEERS_FLAG,
    },
    crd::{version, FoundationDBCluster, ProcessClass},
};

/// The document the monitor of the unified image reads to start its `fdbserver` processes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfiguration {
    pub version: String,

    /// Empty when the monitor can use the binary of its own container.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub binary_path: String,

    pub server_count: u16,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
}

/// Renders the monitor configuration for Pods of `process_class` running `process_count`
/// processes each.
///
/// The monitor starts the desired version, while the binary path follows the version that is
/// currently running. As long as the database has no connection string, the configuration
/// starts no processes.
pub fn build_monitor_configuration(
    cluster: &FoundationDBCluster,
    process_class: ProcessClass,
    process_count: u16,
) -> Result<MonitorConfiguration> {
    let desired_version = &cluster.spec.version;
    let running_version = cluster.running_version();
    let binary_path = if version::binaries_from_main_container(running_version) {
        String::new()
    } else {
        server_binary_path(running_version)
    };

    let configuration = if cluster.connection_string().is_empty() {
        MonitorConfiguration {
            version: desired_version.clone(),
            binary_path,
            server_count: 0,
            arguments: Vec::new(),
        }
    } else {
        MonitorConfiguration {
            version: desired_version.clone(),
            binary_path,
            server_count: process_count,
            arguments: process_arguments(
                cluster,
                process_class,
                process_count,
                AddressStyle::Bracketed,
            )?,
        }
    };

    tracing::debug!(
        %process_class,
        server_count = configuration.server_count,
        arguments = configuration.arguments.len(),
        "Built monitor configuration"
    );
    Ok(configuration)
}

/// The arguments every process of `process_class` is started with.
///
/// The first ten arguments always appear in the same order, consumers compare them by position.
/// Optional arguments follow.
pub(super) fn process_arguments(
    cluster: &FoundationDBCluster,
    process_class: ProcessClass,
    process_count: u16,
    address_style: AddressStyle,
) -> Result<Vec<Argument>> {
    ensure!(process_count > 0, InvalidProcessCountSnafu);
    let custom_parameters = parameters::custom_parameters(cluster, process_class)?;
    let addresses = AddressSpec::resolve(cluster, address_style);

    let data_directory = if process_count == 1 {
        Argument::literal(flag(DATA_DIRECTORY_FLAG, DATA_DIRECTORY))
    } else {
        Argument::concatenate([
            Argument::literal(flag(DATA_DIRECTORY_FLAG, format!("{DATA_DIRECTORY}/"))),
            Argument::process_number(0, 1),
        ])
    };

    let mut arguments = vec![
        Argument::literal(flag(CLUSTER_FILE_FLAG, CLUSTER_FILE_PATH)),
        Argument::literal(flag(SEED_CLUSTER_FILE_FLAG, SEED_CLUSTER_FILE_PATH)),
        addresses.public,
        Argument::literal(flag(CLASS_FLAG, process_class)),
        Argument::literal(flag(LOG_DIRECTORY_FLAG, LOG_DIRECTORY)),
        Argument::literal(flag(LOG_GROUP_FLAG, cluster.log_group())),
        data_directory,
    ];
    arguments.extend(locality::locality_arguments(cluster));
    arguments.extend(custom_parameters.into_iter().map(Argument::literal));
    if let Some(rules) = cluster
        .spec
        .main_container
        .peer_verification_rules
        .as_deref()
        .filter(|rules| !rules.is_empty())
    {
        arguments.push(Argument::literal(flag(TLS_VERIFY_PEERS_FLAG, rules)));
    }
    arguments.extend(addresses.listen);

    Ok(arguments)
}
