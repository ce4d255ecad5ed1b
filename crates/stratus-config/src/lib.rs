// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use stratus_types::{Image, IpTag, MachineRole, MachineSpec, Tags};

/// Configuration for a Stratus reconciler run.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    /// Base64-encoded payload handed to every VM as custom data.
    #[serde(default)]
    pub bootstrap_data: String,

    pub cluster: ClusterConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    #[serde(default, rename = "machine")]
    pub machines: Vec<MachineConfig>,

    #[serde(
        default,
        rename = "public_ip",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub public_ips: Vec<PublicIpConfig>,
}

impl Config {
    /// Constructs a new configuration object.
    ///
    /// Typically, the configuration is parsed from a config
    /// file via [`parse`], but this method allows an alternative
    /// mechanism for initialization.
    pub fn new(cluster: ClusterConfig, machines: Vec<MachineConfig>) -> Config {
        Config {
            bootstrap_data: String::new(),
            cluster,
            engine: EngineConfig::default(),
            image: None,
            machines,
            public_ips: Vec::new(),
        }
    }
}

/// The cluster that owns the machines.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    pub resource_group: String,
    pub location: String,

    /// The subscription recorded on the owning cluster. Empty means the
    /// cluster has not been assigned one yet.
    #[serde(default)]
    pub subscription_id: String,

    #[serde(default)]
    pub additional_tags: Tags,
}

fn default_namespace() -> String {
    "default".to_owned()
}

/// Tunables for the reconciliation engine.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many times to look up the owning cluster before giving up.
    #[serde(default = "default_subscription_attempts")]
    pub subscription_attempts: u32,

    #[serde(default = "default_subscription_retry_interval_ms")]
    pub subscription_retry_interval_ms: u64,
}

impl EngineConfig {
    pub fn subscription_retry_interval(&self) -> Duration {
        Duration::from_millis(self.subscription_retry_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subscription_attempts: default_subscription_attempts(),
            subscription_retry_interval_ms:
                default_subscription_retry_interval_ms(),
        }
    }
}

fn default_subscription_attempts() -> u32 {
    5
}

fn default_subscription_retry_interval_ms() -> u64 {
    1000
}

/// One declared machine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub name: String,

    #[serde(default)]
    pub role: MachineRole,

    pub spec: MachineSpec,
}

/// A standalone public IP owned by the cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicIpConfig {
    pub name: String,

    /// Fully qualified DNS name. The first label becomes the domain name
    /// label.
    #[serde(default)]
    pub dns_name: String,

    #[serde(default)]
    pub ipv6: bool,

    #[serde(default)]
    pub ip_tags: Vec<IpTag>,
}

/// Errors which may be returned when parsing the configuration.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate machine name {0}")]
    DuplicateMachine(String),

    #[error("Duplicate public IP name {0}")]
    DuplicatePublicIp(String),
}

/// Parses a TOML file into a configuration object.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Config, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    from_toml(&contents)
}

/// Parses TOML text into a configuration object.
pub fn from_toml(contents: &str) -> Result<Config, ParseError> {
    let cfg = toml::from_str::<Config>(contents)?;

    let mut seen = std::collections::BTreeSet::new();
    for machine in &cfg.machines {
        if !seen.insert(machine.name.as_str()) {
            return Err(ParseError::DuplicateMachine(machine.name.clone()));
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    for ip in &cfg.public_ips {
        if !seen.insert(ip.name.as_str()) {
            return Err(ParseError::DuplicatePublicIp(ip.name.clone()));
        }
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_types::{CachingType, MarketplaceImage, VmIdentity};

    const EXAMPLE: &str = r#"
bootstrap_data = "I2Nsb3VkLWNvbmZpZwo="

[cluster]
name = "prod-east"
resource_group = "prod-east-rg"
location = "eastus"
subscription_id = "00000000-1111-2222-3333-444444444444"

[cluster.additional_tags]
team = "infra"

[engine]
subscription_attempts = 3

[image.marketplace]
publisher = "canonical"
offer = "ubuntu"
sku = "22_04-lts"
version = "latest"

[[machine]]
name = "cp-0"
role = "control-plane"

[machine.spec]
vm_size = "Standard_D4s_v3"
failure_domain = "1"
subnet_name = "control-plane-subnet"

[machine.spec.os_disk]
os_type = "Linux"
disk_size_gb = 128

[machine.spec.identity]
type = "SystemAssigned"

[[machine.spec.data_disks]]
name_suffix = "etcd"
disk_size_gb = 256
caching_type = "ReadOnly"

[[machine]]
name = "node-0"

[machine.spec]
vm_size = "Standard_D2s_v3"

[machine.spec.os_disk]
os_type = "Linux"

[[public_ip]]
name = "api-server-ip"
dns_name = "prod-east-api.eastus.cloudapp.example.com"

[[public_ip.ip_tags]]
type = "RoutingPreference"
tag = "Internet"
"#;

    #[test]
    fn parses_example() {
        let cfg = from_toml(EXAMPLE).unwrap();

        assert_eq!(cfg.cluster.name, "prod-east");
        assert_eq!(cfg.cluster.namespace, "default");
        assert_eq!(cfg.cluster.additional_tags["team"], "infra");
        assert_eq!(cfg.engine.subscription_attempts, 3);
        assert_eq!(
            cfg.engine.subscription_retry_interval(),
            Duration::from_secs(1)
        );
        assert_eq!(
            cfg.image,
            Some(Image::Marketplace(MarketplaceImage {
                publisher: "canonical".to_owned(),
                offer: "ubuntu".to_owned(),
                sku: "22_04-lts".to_owned(),
                version: "latest".to_owned(),
                third_party_image: false,
            }))
        );

        assert_eq!(cfg.machines.len(), 2);
        let cp = &cfg.machines[0];
        assert_eq!(cp.role, MachineRole::ControlPlane);
        assert_eq!(cp.spec.failure_domain.as_deref(), Some("1"));
        assert!(matches!(cp.spec.identity, VmIdentity::SystemAssigned { .. }));
        assert_eq!(
            cp.spec.data_disks[0].caching_type,
            Some(CachingType::ReadOnly)
        );
        assert_eq!(cp.spec.data_disks[0].lun, None);
        assert_eq!(cfg.machines[1].role, MachineRole::Node);

        assert_eq!(cfg.public_ips.len(), 1);
        let ip = &cfg.public_ips[0];
        assert!(!ip.ipv6);
        assert_eq!(
            ip.ip_tags,
            vec![IpTag {
                ip_tag_type: "RoutingPreference".to_owned(),
                tag: "Internet".to_owned(),
            }]
        );
    }

    #[test]
    fn duplicate_machines_are_rejected() {
        let contents = r#"
[cluster]
name = "c"
resource_group = "rg"
location = "westus"

[[machine]]
name = "m"
spec = { vm_size = "s", os_disk = { os_type = "Linux" } }

[[machine]]
name = "m"
spec = { vm_size = "s", os_disk = { os_type = "Linux" } }
"#;
        assert!(matches!(
            from_toml(contents),
            Err(ParseError::DuplicateMachine(name)) if name == "m"
        ));
    }

    #[test]
    fn config_can_be_serialized_as_toml() {
        let cfg = from_toml(EXAMPLE).unwrap();
        let serialized = toml::ser::to_string(&cfg).unwrap();
        let deserialized: Config = toml::de::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);

        let dummy_config = Config::new(
            ClusterConfig {
                name: "c".to_owned(),
                namespace: "ns".to_owned(),
                resource_group: "rg".to_owned(),
                location: "westus".to_owned(),
                ..Default::default()
            },
            Vec::new(),
        );
        let serialized = toml::ser::to_string(&dummy_config).unwrap();
        let deserialized: Config = toml::de::from_str(&serialized).unwrap();
        assert_eq!(dummy_config, deserialized);
    }
}
