use snafu::{ensure, ResultExt};

use crate::{
    config::{
        address::AddressStyle, argument::Argument, monitor::process_arguments, server_binary_path,
        InvalidProcessCountSnafu, ProcessNumberOutOfRangeSnafu, ResolveArgumentSnafu, Result,
        ENV_INSTANCE_ID, PROCESS_ID_FLAG,
    },
    crd::{FoundationDBCluster, ProcessClass},
    process_client::ProcessClient,
};

/// Builds the literal command line of process `process_number` (1-based) out of the
/// `process_count` processes of a Pod.
///
/// Environment references are looked up through `client` right away. The split image gets its
/// arguments sorted by flag name; the unified image keeps the order of the monitor
/// configuration.
pub fn build_start_command(
    cluster: &FoundationDBCluster,
    process_class: ProcessClass,
    client: &dyn ProcessClient,
    process_number: u16,
    process_count: u16,
) -> Result<String> {
    ensure!(process_count > 0, InvalidProcessCountSnafu);
    ensure!(
        (1..=process_count).contains(&process_number),
        ProcessNumberOutOfRangeSnafu {
            process_number,
            process_count,
        }
    );

    let arguments = if cluster.use_unified_image() {
        process_arguments(
            cluster,
            process_class,
            process_count,
            AddressStyle::Bracketed,
        )?
    } else {
        let mut arguments =
            process_arguments(cluster, process_class, process_count, AddressStyle::Bare)?;
        if process_count > 1 {
            arguments.push(Argument::concatenate([
                Argument::literal(format!("--{PROCESS_ID_FLAG}=")),
                Argument::environment(ENV_INSTANCE_ID),
                Argument::literal("-"),
                Argument::process_number(0, 1),
            ]));
        }
        arguments.sort_by(|a, b| a.flag_name().cmp(&b.flag_name()));
        arguments
    };

    let mut command = vec![server_binary_path(cluster.running_version())];
    for argument in &arguments {
        command.push(argument.resolve(process_number, client).context(
            ResolveArgumentSnafu {
                flag: argument.flag_name().unwrap_or_default(),
            },
        )?);
    }

    tracing::debug!(%process_class, process_number, process_count, "Built start command");
    Ok(command.join(" "))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        config::test_support::{default_cluster, status_mut},
        crd::{version, FaultDomain, PublicIpSource, FAULT_DOMAIN_KEY_KUBERNETES_CLUSTER},
        process_client::{PodPlacement, SubstitutionProcessClient},
    };

    const POD_IP: &str = "1.1.1.1";

    fn placement() -> PodPlacement {
        PodPlacement {
            pod_ip: POD_IP.to_string(),
            ..PodPlacement::default()
        }
    }

    fn start_command(
        cluster: &FoundationDBCluster,
        placement: &PodPlacement,
        process_number: u16,
        process_count: u16,
    ) -> String {
        let client = SubstitutionProcessClient::for_pod(cluster, placement, "storage-1");
        build_start_command(
            cluster,
            ProcessClass::Storage,
            &client,
            process_number,
            process_count,
        )
        .unwrap()
    }

    fn split_command(binary: &str, locality: [&str; 3], public_address: &str) -> String {
        let arguments: [&str; 11] = [
            binary,
            "--class=storage",
            "--cluster_file=/var/fdb/data/fdb.cluster",
            "--datadir=/var/fdb/data",
            &format!("--locality_instance_id={}", locality[0]),
            &format!("--locality_machineid={}", locality[1]),
            &format!("--locality_zoneid={}", locality[2]),
            "--logdir=/var/log/fdb-trace-logs",
            "--loggroup=operator-test",
            &format!("--public_address={public_address}"),
            "--seed_cluster_file=/var/dynamic-conf/fdb.cluster",
        ];
        arguments.join(" ")
    }

    const DEFAULT_LOCALITY: [&str; 3] = [
        "storage-1",
        "operator-test-storage-1",
        "operator-test-storage-1",
    ];

    #[test]
    fn test_basic_storage_process() {
        assert_eq!(
            start_command(&default_cluster(), &placement(), 1, 1),
            "/usr/bin/fdbserver --class=storage --cluster_file=/var/fdb/data/fdb.cluster \
             --datadir=/var/fdb/data --locality_instance_id=storage-1 \
             --locality_machineid=operator-test-storage-1 \
             --locality_zoneid=operator-test-storage-1 --logdir=/var/log/fdb-trace-logs \
             --loggroup=operator-test --public_address=1.1.1.1:4501 \
             --seed_cluster_file=/var/dynamic-conf/fdb.cluster"
        );
    }

    #[test]
    fn test_split_image_with_service_ip() {
        let mut cluster = default_cluster();
        cluster.spec.use_unified_image = Some(false);
        cluster.spec.routing.public_ip_source = Some(PublicIpSource::Service);
        status_mut(&mut cluster).has_listen_ips_for_all_pods = true;
        let placement = PodPlacement {
            service_ip: Some("2.2.2.2".to_string()),
            ..placement()
        };

        assert_eq!(
            start_command(&cluster, &placement, 1, 1),
            [
                "/usr/bin/fdbserver",
                "--class=storage",
                "--cluster_file=/var/fdb/data/fdb.cluster",
                "--datadir=/var/fdb/data",
                "--listen_address=1.1.1.1:4501",
                "--locality_instance_id=storage-1",
                "--locality_machineid=operator-test-storage-1",
                "--locality_zoneid=operator-test-storage-1",
                "--logdir=/var/log/fdb-trace-logs",
                "--loggroup=operator-test",
                "--public_address=2.2.2.2:4501",
                "--seed_cluster_file=/var/dynamic-conf/fdb.cluster",
            ]
            .join(" ")
        );

        // the listen address is left out until every Pod knows its own IP
        status_mut(&mut cluster).has_listen_ips_for_all_pods = false;
        assert_eq!(
            start_command(&cluster, &placement, 1, 1),
            split_command("/usr/bin/fdbserver", DEFAULT_LOCALITY, "2.2.2.2:4501")
        );
    }

    #[test]
    fn test_unified_image() {
        let mut cluster = default_cluster();
        cluster.spec.use_unified_image = Some(true);

        assert_eq!(
            start_command(&cluster, &placement(), 1, 1),
            [
                "/usr/bin/fdbserver",
                "--cluster_file=/var/fdb/data/fdb.cluster",
                "--seed_cluster_file=/var/dynamic-conf/fdb.cluster",
                "--public_address=[1.1.1.1]:4501",
                "--class=storage",
                "--logdir=/var/log/fdb-trace-logs",
                "--loggroup=operator-test",
                "--datadir=/var/fdb/data",
                "--locality_instance_id=storage-1",
                "--locality_machineid=operator-test-storage-1",
                "--locality_zoneid=operator-test-storage-1",
            ]
            .join(" ")
        );
    }

    #[test]
    fn test_unified_image_with_multiple_processes() {
        let mut cluster = default_cluster();
        cluster.spec.use_unified_image = Some(true);

        assert_eq!(
            start_command(&cluster, &placement(), 2, 3),
            [
                "/usr/bin/fdbserver",
                "--cluster_file=/var/fdb/data/fdb.cluster",
                "--seed_cluster_file=/var/dynamic-conf/fdb.cluster",
                "--public_address=[1.1.1.1]:4503",
                "--class=storage",
                "--logdir=/var/log/fdb-trace-logs",
                "--loggroup=operator-test",
                "--datadir=/var/fdb/data/2",
                "--locality_instance_id=storage-1",
                "--locality_machineid=operator-test-storage-1",
                "--locality_zoneid=operator-test-storage-1",
            ]
            .join(" ")
        );
    }

    #[test]
    fn test_multiple_storage_servers_per_pod() {
        let cluster = default_cluster();
        let expected = |process_number: u16, port: u16| {
            [
                "/usr/bin/fdbserver".to_string(),
                "--class=storage".to_string(),
                "--cluster_file=/var/fdb/data/fdb.cluster".to_string(),
                format!("--datadir=/var/fdb/data/{process_number}"),
                "--locality_instance_id=storage-1".to_string(),
                "--locality_machineid=operator-test-storage-1".to_string(),
                format!("--locality_process_id=storage-1-{process_number}"),
                "--locality_zoneid=operator-test-storage-1".to_string(),
                "--logdir=/var/log/fdb-trace-logs".to_string(),
                "--loggroup=operator-test".to_string(),
                format!("--public_address=1.1.1.1:{port}"),
                "--seed_cluster_file=/var/dynamic-conf/fdb.cluster".to_string(),
            ]
            .join(" ")
        };

        assert_eq!(start_command(&cluster, &placement(), 1, 2), expected(1, 4501));
        assert_eq!(start_command(&cluster, &placement(), 2, 2), expected(2, 4503));
    }

    #[test]
    fn test_host_replication() {
        let mut cluster = default_cluster();
        cluster.spec.fault_domain = FaultDomain::default();
        let placement = PodPlacement {
            node_name: Some("machine1".to_string()),
            ..placement()
        };

        assert_eq!(
            start_command(&cluster, &placement, 1, 1),
            split_command(
                "/usr/bin/fdbserver",
                ["storage-1", "machine1", "machine1"],
                "1.1.1.1:4501"
            )
        );
    }

    #[test]
    fn test_cross_kubernetes_replication() {
        let mut cluster = default_cluster();
        cluster.spec.fault_domain = FaultDomain {
            key: Some(FAULT_DOMAIN_KEY_KUBERNETES_CLUSTER.to_string()),
            value: Some("kc2".to_string()),
            ..FaultDomain::default()
        };
        let placement = PodPlacement {
            node_name: Some("machine1".to_string()),
            ..placement()
        };

        assert_eq!(
            start_command(&cluster, &placement, 1, 1),
            split_command(
                "/usr/bin/fdbserver",
                ["storage-1", "machine1", "kc2"],
                "1.1.1.1:4501"
            )
        );
    }

    #[test]
    fn test_binaries_from_main_container() {
        let mut cluster = default_cluster();
        cluster.spec.version = version::WITH_BINARIES_FROM_MAIN_CONTAINER.to_string();
        status_mut(&mut cluster).running_version =
            Some(version::WITH_BINARIES_FROM_MAIN_CONTAINER.to_string());

        assert_eq!(
            start_command(&cluster, &placement(), 1, 1),
            split_command("/usr/bin/fdbserver", DEFAULT_LOCALITY, "1.1.1.1:4501")
        );
    }

    #[test]
    fn test_binaries_from_sidecar_container() {
        let mut cluster = default_cluster();
        cluster.spec.version = version::WITHOUT_BINARIES_FROM_MAIN_CONTAINER.to_string();
        status_mut(&mut cluster).running_version =
            Some(version::WITHOUT_BINARIES_FROM_MAIN_CONTAINER.to_string());

        assert_eq!(
            start_command(&cluster, &placement(), 1, 1),
            split_command(
                "/var/dynamic-conf/bin/6.2.11/fdbserver",
                DEFAULT_LOCALITY,
                "1.1.1.1:4501"
            )
        );
    }

    #[test]
    fn test_tls_transition() {
        let mut cluster = default_cluster();
        status_mut(&mut cluster).required_addresses.tls = true;

        assert_eq!(
            start_command(&cluster, &placement(), 1, 1),
            split_command(
                "/usr/bin/fdbserver",
                DEFAULT_LOCALITY,
                "1.1.1.1:4500:tls,1.1.1.1:4501"
            )
        );
    }

    #[test]
    fn test_custom_parameters_are_sorted() {
        let mut cluster = default_cluster();
        cluster.spec.processes.insert(
            ProcessClass::General,
            crate::crd::ProcessSettings {
                custom_parameters: Some(vec!["knob_disable_posix_kernel_aio = 1".to_string()]),
            },
        );
        let command = start_command(&cluster, &placement(), 1, 1);

        assert!(command.contains(
            "--datadir=/var/fdb/data --knob_disable_posix_kernel_aio=1 --locality_instance_id"
        ));
    }

    #[test]
    fn test_missing_environment_value() {
        let cluster = default_cluster();
        let client = SubstitutionProcessClient::new(BTreeMap::new());
        let error =
            build_start_command(&cluster, ProcessClass::Storage, &client, 1, 1).unwrap_err();

        assert_eq!(
            error.to_string(),
            "failed to resolve the value of argument --locality_instance_id"
        );
    }

    #[test]
    fn test_process_number_out_of_range() {
        let client =
            SubstitutionProcessClient::for_pod(&default_cluster(), &placement(), "storage-1");

        for (process_number, process_count) in [(0, 1), (3, 2)] {
            assert!(build_start_command(
                &default_cluster(),
                ProcessClass::Storage,
                &client,
                process_number,
                process_count
            )
            .is_err());
        }
    }

    #[test]
    fn test_deterministic() {
        let cluster = default_cluster();

        assert_eq!(
            start_command(&cluster, &placement(), 2, 2),
            start_command(&cluster, &placement(), 2, 2)
        );
    }
}
