use std::collections::BTreeMap;

use stackable_operator::kube::ResourceExt;

use crate::{
    config::{
        argument::Argument, flag, DATA_CENTER_FLAG, DATA_HALL_FLAG, ENV_INSTANCE_ID,
        ENV_MACHINE_ID, ENV_ZONE_ID, INSTANCE_ID_FLAG, MACHINE_ID_FLAG, ZONE_ID_FLAG,
    },
    crd::{FoundationDBCluster, FAULT_DOMAIN_KEY_NONE},
    process_client::PodPlacement,
};

/// The locality of one process group, as seen by the database.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Locality {
    pub instance_id: String,
    pub machine_id: String,
    pub zone_id: String,
    pub data_center: Option<String>,
    pub data_hall: Option<String>,
}

impl Locality {
    pub fn resolve(
        cluster: &FoundationDBCluster,
        placement: &PodPlacement,
        process_group_id: &str,
    ) -> Self {
        let fault_domain = &cluster.spec.fault_domain;
        let pod_name = format!("{}-{process_group_id}", cluster.name_any());

        let machine_id = if fault_domain.key() == FAULT_DOMAIN_KEY_NONE {
            pod_name
        } else {
            placement.node_name.clone().unwrap_or(pod_name)
        };

        let zone_id = if let Some(variable) = fault_domain.zone_variable() {
            placement
                .environment
                .get(variable)
                .cloned()
                .unwrap_or_else(|| machine_id.clone())
        } else if let Some(value) = fixed_zone_id(cluster) {
            value.to_string()
        } else {
            machine_id.clone()
        };

        Self {
            instance_id: process_group_id.to_string(),
            machine_id,
            zone_id,
            data_center: non_empty(&cluster.spec.data_center).map(str::to_string),
            data_hall: non_empty(&cluster.spec.data_hall).map(str::to_string),
        }
    }

    /// The variables the locality arguments refer to.
    pub fn environment(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ENV_INSTANCE_ID.to_string(), self.instance_id.clone()),
            (ENV_MACHINE_ID.to_string(), self.machine_id.clone()),
            (ENV_ZONE_ID.to_string(), self.zone_id.clone()),
        ])
    }
}

/// Instance, machine and zone ID, followed by data center and data hall when configured.
pub fn locality_arguments(cluster: &FoundationDBCluster) -> Vec<Argument> {
    let mut arguments = vec![
        environment_flag(INSTANCE_ID_FLAG, ENV_INSTANCE_ID),
        environment_flag(MACHINE_ID_FLAG, ENV_MACHINE_ID),
        zone_argument(cluster),
    ];
    if let Some(data_center) = non_empty(&cluster.spec.data_center) {
        arguments.push(Argument::literal(flag(DATA_CENTER_FLAG, data_center)));
    }
    if let Some(data_hall) = non_empty(&cluster.spec.data_hall) {
        arguments.push(Argument::literal(flag(DATA_HALL_FLAG, data_hall)));
    }
    arguments
}

fn zone_argument(cluster: &FoundationDBCluster) -> Argument {
    if let Some(variable) = cluster.spec.fault_domain.zone_variable() {
        environment_flag(ZONE_ID_FLAG, variable)
    } else if let Some(value) = fixed_zone_id(cluster) {
        // shared by every Pod of this Kubernetes cluster
        Argument::literal(flag(ZONE_ID_FLAG, value))
    } else {
        environment_flag(ZONE_ID_FLAG, ENV_ZONE_ID)
    }
}

fn environment_flag(name: &str, variable: &str) -> Argument {
    Argument::concatenate([
        Argument::literal(format!("--{name}=")),
        Argument::environment(variable),
    ])
}

fn fixed_zone_id(cluster: &FoundationDBCluster) -> Option<&str> {
    non_empty(&cluster.spec.fault_domain.value)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
