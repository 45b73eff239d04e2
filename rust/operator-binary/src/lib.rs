//! Compiles a [`crd::FoundationDBCluster`] into the startup configuration of its `fdbserver`
//! processes.
//!
//! The monitor configuration rendered by [`config::monitor`] is reconciled into the cluster by
//! [`controller`]. Pod tooling that starts processes without the monitor builds their command
//! line with [`config::start_command`] and a [`process_client::ProcessClient`].
pub mod config;
pub mod controller;
pub mod crd;
pub mod process_client;

pub const OPERATOR_NAME: &str = "foundationdb.stackable.tech";
