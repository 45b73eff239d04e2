use crate::{
    config::{argument::Argument, ENV_POD_IP, ENV_PUBLIC_IP, LISTEN_ADDRESS_FLAG, PUBLIC_ADDRESS_FLAG},
    crd::{FoundationDBCluster, PublicIpSource},
    process_client::PodPlacement,
};

/// Ports are handed out in pairs per process, the TLS port directly below the plain one.
const TLS_PORT_OFFSET: i64 = 4498;
const NON_TLS_PORT_OFFSET: i64 = 4499;
const PORT_STRIDE: i64 = 2;

const TLS_SUFFIX: &str = ":tls";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AddressFamily {
    Tls,
    NonTls,
}

impl AddressFamily {
    fn port(self) -> Argument {
        let offset = match self {
            Self::Tls => TLS_PORT_OFFSET,
            Self::NonTls => NON_TLS_PORT_OFFSET,
        };
        Argument::process_number(offset, PORT_STRIDE)
    }
}

/// How the IP is written in front of the port.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressStyle {
    /// `[ip]:port`, as understood by the monitor.
    Bracketed,
    /// `ip:port`, as written into the start command of the split image.
    Bare,
}

/// The address arguments of one process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressSpec {
    pub public: Argument,
    /// Only set when processes advertise a Service IP and every Pod knows its own IP.
    pub listen: Option<Argument>,
}

impl AddressSpec {
    pub fn resolve(cluster: &FoundationDBCluster, style: AddressStyle) -> Self {
        let families = required_families(cluster);
        let listen = (cluster.public_ip_source() == PublicIpSource::Service
            && cluster.has_listen_ips_for_all_pods())
        .then(|| address_argument(LISTEN_ADDRESS_FLAG, ENV_POD_IP, &families, style));

        Self {
            public: address_argument(PUBLIC_ADDRESS_FLAG, ENV_PUBLIC_IP, &families, style),
            listen,
        }
    }
}

/// The IP other processes reach this process on.
pub fn public_ip<'a>(cluster: &FoundationDBCluster, placement: &'a PodPlacement) -> &'a str {
    match (cluster.public_ip_source(), &placement.service_ip) {
        (PublicIpSource::Service, Some(service_ip)) => service_ip,
        _ => &placement.pod_ip,
    }
}

/// TLS comes first while both families are required. Without any requirement the process
/// listens without TLS.
fn required_families(cluster: &FoundationDBCluster) -> Vec<AddressFamily> {
    let required = cluster.required_addresses();
    let mut families = Vec::with_capacity(2);
    if required.tls {
        families.push(AddressFamily::Tls);
    }
    if required.non_tls || !required.tls {
        families.push(AddressFamily::NonTls);
    }
    families
}

fn address_argument(
    flag: &str,
    ip_variable: &str,
    families: &[AddressFamily],
    style: AddressStyle,
) -> Argument {
    let (open, close) = match style {
        AddressStyle::Bracketed => ("[", "]:"),
        AddressStyle::Bare => ("", ":"),
    };

    let mut parts = Vec::new();
    let mut separator = format!("--{flag}=");
    for family in families {
        parts.push(Argument::literal(format!("{separator}{open}")));
        parts.push(Argument::environment(ip_variable));
        parts.push(Argument::literal(close));
        parts.push(family.port());
        if *family == AddressFamily::Tls {
            parts.push(Argument::literal(TLS_SUFFIX));
        }
        separator = ",".to_string();
    }
    Argument::concatenate(parts)
}
