//! Renders the monitor configuration of every process class of a [`FoundationDBCluster`] into a
//! `ConfigMap` that is mounted into its Pods.
use std::{sync::Arc, time::Duration};

use snafu::{ResultExt, Snafu};
use stackable_operator::{
    builder::{configmap::ConfigMapBuilder, meta::ObjectMetaBuilder},
    client::Client,
    k8s_openapi::api::core::v1::ConfigMap,
    kube::{
        core::{error_boundary, DeserializeGuard},
        runtime::controller::Action,
        ResourceExt,
    },
    kvp::ObjectLabels,
    logging::controller::ReconcilerError,
};
use strum::{EnumDiscriminants, IntoStaticStr};

use crate::{
    config::{self, monitor::build_monitor_configuration},
    crd::{FoundationDBCluster, ProcessClass, APP_NAME},
    OPERATOR_NAME,
};

pub const FOUNDATIONDB_CONTROLLER_NAME: &str = "foundationdbcluster";
pub const FOUNDATIONDB_FULL_CONTROLLER_NAME: &str =
    "foundationdbcluster.foundationdb.stackable.tech";

const FIELD_MANAGER_SCOPE: &str = "foundationdbcluster";

pub const CLUSTER_FILE_KEY: &str = "cluster-file";
pub const RUNNING_VERSION_KEY: &str = "running-version";

pub struct Ctx {
    pub client: Client,
}

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("FoundationDBCluster object is invalid"))]
    InvalidFoundationDBCluster {
        source: error_boundary::InvalidObject,
    },

    #[snafu(display("failed to build the monitor configuration for process class {process_class}"))]
    BuildMonitorConfiguration {
        source: config::Error,
        process_class: ProcessClass,
    },

    #[snafu(display("failed to serialize the monitor configuration for process class {process_class}"))]
    SerializeMonitorConfiguration {
        source: serde_json::Error,
        process_class: ProcessClass,
    },

    #[snafu(display("object is missing metadata to build owner reference"))]
    ObjectMissingMetadataForOwnerRef {
        source: stackable_operator::builder::meta::Error,
    },

    #[snafu(display("failed to build metadata"))]
    MetadataBuild {
        source: stackable_operator::builder::meta::Error,
    },

    #[snafu(display("failed to build ConfigMap"))]
    BuildConfigMap {
        source: stackable_operator::builder::configmap::Error,
    },

    #[snafu(display("failed to apply ConfigMap {name}"))]
    ApplyConfigMap {
        source: stackable_operator::client::Error,
        name: String,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        ErrorDiscriminants::from(self).into()
    }
}

pub async fn reconcile_foundationdb(
    fdb: Arc<DeserializeGuard<FoundationDBCluster>>,
    ctx: Arc<Ctx>,
) -> Result<Action> {
    tracing::info!("Starting reconcile");
    let fdb = fdb
        .0
        .as_ref()
        .map_err(error_boundary::InvalidObject::clone)
        .context(InvalidFoundationDBClusterSnafu)?;

    let config_map = build_cluster_config_map(fdb)?;
    ctx.client
        .apply_patch(FIELD_MANAGER_SCOPE, &config_map, &config_map)
        .await
        .with_context(|_| ApplyConfigMapSnafu {
            name: config_map.name_any(),
        })?;

    Ok(Action::await_change())
}

pub fn error_policy(
    _obj: Arc<DeserializeGuard<FoundationDBCluster>>,
    error: &Error,
    _ctx: Arc<Ctx>,
) -> Action {
    match error {
        // an invalid object only becomes valid through a change
        Error::InvalidFoundationDBCluster { .. } => Action::await_change(),
        _ => Action::requeue(Duration::from_secs(10)),
    }
}

pub fn config_map_name(fdb: &FoundationDBCluster) -> String {
    format!("{}-config", fdb.name_any())
}

/// The key the monitor configuration of `process_class` is stored under.
pub fn monitor_configuration_key(process_class: ProcessClass) -> String {
    format!("fdbmonitor-conf-{process_class}-json")
}

pub fn build_recommended_labels<'a>(
    owner: &'a FoundationDBCluster,
    app_version: &'a str,
    role: &'a str,
    role_group: &'a str,
) -> ObjectLabels<'a, FoundationDBCluster> {
    ObjectLabels {
        owner,
        app_name: APP_NAME,
        app_version,
        operator_name: OPERATOR_NAME,
        controller_name: FOUNDATIONDB_CONTROLLER_NAME,
        role,
        role_group,
    }
}

/// The `ConfigMap` shared by all Pods of the cluster.
fn build_cluster_config_map(fdb: &FoundationDBCluster) -> Result<ConfigMap> {
    let mut config_map = ConfigMapBuilder::new();
    config_map.metadata(
        ObjectMetaBuilder::new()
            .name_and_namespace(fdb)
            .name(config_map_name(fdb))
            .ownerreference_from_resource(fdb, None, Some(true))
            .context(ObjectMissingMetadataForOwnerRefSnafu)?
            .with_recommended_labels(build_recommended_labels(
                fdb,
                fdb.running_version(),
                "global",
                "global",
            ))
            .context(MetadataBuildSnafu)?
            .build(),
    );

    for process_class in fdb.process_classes() {
        let configuration = build_monitor_configuration(
            fdb,
            process_class,
            fdb.processes_per_pod(process_class),
        )
        .context(BuildMonitorConfigurationSnafu { process_class })?;
        config_map.add_data(
            monitor_configuration_key(process_class),
            serde_json::to_string(&configuration)
                .context(SerializeMonitorConfigurationSnafu { process_class })?,
        );
    }

    let connection_string = fdb.connection_string();
    if !connection_string.is_empty() {
        config_map.add_data(CLUSTER_FILE_KEY, connection_string);
    }
    config_map.add_data(RUNNING_VERSION_KEY, fdb.running_version());

    config_map.build().context(BuildConfigMapSnafu)
}
