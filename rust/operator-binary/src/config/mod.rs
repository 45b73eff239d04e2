//! Renders the startup configuration of a single `fdbserver` process.
//!
//! Two output formats are supported: the [`monitor::MonitorConfiguration`] consumed by the
//! monitor of the unified image, and the literal start command of the split image built by
//! [`start_command::build_start_command`]. Both are assembled from the same
//! [`argument::Argument`] building blocks.
use snafu::Snafu;

use crate::{crd::version, process_client};

pub mod address;
pub mod argument;
pub mod locality;
pub mod monitor;
pub mod parameters;
pub mod start_command;

pub const CLUSTER_FILE_PATH: &str = "/var/fdb/data/fdb.cluster";
pub const SEED_CLUSTER_FILE_PATH: &str = "/var/dynamic-conf/fdb.cluster";
pub const DATA_DIRECTORY: &str = "/var/fdb/data";
pub const LOG_DIRECTORY: &str = "/var/log/fdb-trace-logs";

/// Where the main container keeps `fdbserver`.
pub const DEFAULT_BINARY_PATH: &str = "/usr/bin/fdbserver";
/// Root of the volume the sidecar copies versioned binaries into.
pub const SHARED_BINARY_DIRECTORY: &str = "/var/dynamic-conf/bin";

pub const ENV_PUBLIC_IP: &str = "FDB_PUBLIC_IP";
pub const ENV_POD_IP: &str = "FDB_POD_IP";
pub const ENV_INSTANCE_ID: &str = "FDB_INSTANCE_ID";
pub const ENV_MACHINE_ID: &str = "FDB_MACHINE_ID";
pub const ENV_ZONE_ID: &str = "FDB_ZONE_ID";

pub const CLUSTER_FILE_FLAG: &str = "cluster_file";
pub const SEED_CLUSTER_FILE_FLAG: &str = "seed_cluster_file";
pub const PUBLIC_ADDRESS_FLAG: &str = "public_address";
pub const LISTEN_ADDRESS_FLAG: &str = "listen_address";
pub const CLASS_FLAG: &str = "class";
pub const LOG_DIRECTORY_FLAG: &str = "logdir";
pub const LOG_GROUP_FLAG: &str = "loggroup";
pub const DATA_DIRECTORY_FLAG: &str = "datadir";
pub const INSTANCE_ID_FLAG: &str = "locality_instance_id";
pub const MACHINE_ID_FLAG: &str = "locality_machineid";
pub const PROCESS_ID_FLAG: &str = "locality_process_id";
pub const ZONE_ID_FLAG: &str = "locality_zoneid";
pub const DATA_CENTER_FLAG: &str = "locality_dcid";
pub const DATA_HALL_FLAG: &str = "locality_data_hall";
pub const TLS_VERIFY_PEERS_FLAG: &str = "tls_verify_peers";

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("custom parameter {parameter:?} is not of the form \"name=value\""))]
    InvalidCustomParameter { parameter: String },

    #[snafu(display("process number {process_number} is outside of 1..={process_count}"))]
    ProcessNumberOutOfRange {
        process_number: u16,
        process_count: u16,
    },

    #[snafu(display("a Pod has to run at least one process"))]
    InvalidProcessCount,

    #[snafu(display("failed to resolve the value of argument --{flag}"))]
    ResolveArgument {
        source: process_client::Error,
        flag: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// `--<flag>=<value>`
pub fn flag(name: &str, value: impl std::fmt::Display) -> String {
    format!("--{name}={value}")
}

/// The `fdbserver` binary for `version`: the bundled one when the main container ships it,
/// otherwise the copy the sidecar placed on the shared volume.
pub fn server_binary_path(version: &str) -> String {
    if version::binaries_from_main_container(version) {
        DEFAULT_BINARY_PATH.to_string()
    } else {
        format!("{SHARED_BINARY_DIRECTORY}/{version}/fdbserver")
    }
}
