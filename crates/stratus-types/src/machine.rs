// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Declarative machine descriptions.
//!
//! A [`MachineSpec`] is what a user writes: it may leave many fields empty and
//! still carries deprecated fields for backward compatibility. Once it has
//! been normalized (see [`crate::defaults`]) it is flattened into a
//! [`VmSpec`], which is the complete, per-VM input the reconciler works from.

use serde::{Deserialize, Serialize};

use crate::{DataDisk, Image, OsDisk, Tags};

/// The role a machine plays in its cluster.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MachineRole {
    ControlPlane,
    #[default]
    Node,
}

/// A role assignment granted to a VM's system-assigned identity.
///
/// Empty fields are unset and are filled in independently of one another by
/// [`MachineSpec::set_identity_defaults`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoleAssignment {
    /// The role assignment's name; a UUID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The resource path the role is granted over.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    /// The role definition's resource path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub definition_id: String,
}

/// A user-assigned identity to attach to a VM.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserAssignedIdentity {
    /// The identity's provider resource ID.
    pub provider_id: String,
}

/// The managed identity a VM runs with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum VmIdentity {
    #[default]
    None,
    SystemAssigned {
        #[serde(default)]
        role: RoleAssignment,
    },
    UserAssigned {
        identities: Vec<UserAssignedIdentity>,
    },
}

/// Marks a VM as a discounted, preemptible spot instance. Evicted spot VMs
/// are deallocated rather than deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpotVmOptions {}

/// One network interface to create for a machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkInterface {
    pub subnet_name: String,

    /// The number of private IP configurations on the interface.
    #[serde(default)]
    pub private_ip_configs: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerated_networking: Option<bool>,
}

/// A tag attached to a public IP, such as a routing preference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IpTag {
    #[serde(rename = "type")]
    pub ip_tag_type: String,
    pub tag: String,
}

/// A user-authored description of one machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MachineSpec {
    pub vm_size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    /// The base64 encoding of an OpenSSH authorized-keys line.
    #[serde(default)]
    pub ssh_public_key: String,

    #[serde(default)]
    pub identity: VmIdentity,

    pub os_disk: OsDisk,

    #[serde(default)]
    pub data_disks: Vec<DataDisk>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_vm_options: Option<SpotVmOptions>,

    #[serde(default)]
    pub additional_tags: Tags,

    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,

    /// Deprecated: use `network_interfaces`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,

    /// Deprecated: use `network_interfaces`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerated_networking: Option<bool>,
}

/// Everything the reconciler needs to create one VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VmSpec {
    pub name: String,
    pub role: MachineRole,

    /// Names of the VM's network interfaces. The first is the primary.
    pub nic_names: Vec<String>,

    /// The base64 encoding of an OpenSSH authorized-keys line.
    pub ssh_key_data: String,

    pub size: String,
    pub zone: Option<String>,
    pub identity: VmIdentity,
    pub os_disk: OsDisk,
    pub data_disks: Vec<DataDisk>,
    pub spot_vm_options: Option<SpotVmOptions>,
    pub additional_tags: Tags,
}

impl VmSpec {
    /// Flattens a (normalized) machine spec into the reconciler's input.
    ///
    /// Network interface names are derived from the machine name: a single
    /// interface is called `<name>-nic`, multiple interfaces are
    /// `<name>-nic-<index>`. A machine with no interfaces still gets one.
    pub fn from_machine(
        name: impl Into<String>,
        role: MachineRole,
        spec: &MachineSpec,
    ) -> Self {
        let name = name.into();
        let nic_names = match spec.network_interfaces.len() {
            0 | 1 => vec![format!("{name}-nic")],
            n => (0..n).map(|i| format!("{name}-nic-{i}")).collect(),
        };

        Self {
            nic_names,
            role,
            ssh_key_data: spec.ssh_public_key.clone(),
            size: spec.vm_size.clone(),
            zone: spec.failure_domain.clone(),
            identity: spec.identity.clone(),
            os_disk: spec.os_disk.clone(),
            data_disks: spec.data_disks.clone(),
            spot_vm_options: spec.spot_vm_options.clone(),
            additional_tags: spec.additional_tags.clone(),
            name,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_serialization() {
        let identity: VmIdentity = serde_json::from_str(
            r#"{"type": "SystemAssigned", "role": {"scope": "/subscriptions/s/"}}"#,
        )
        .unwrap();
        assert_eq!(
            identity,
            VmIdentity::SystemAssigned {
                role: RoleAssignment {
                    scope: "/subscriptions/s/".to_owned(),
                    ..Default::default()
                }
            }
        );

        let identity: VmIdentity =
            serde_json::from_str(r#"{"type": "SystemAssigned"}"#).unwrap();
        assert_eq!(
            identity,
            VmIdentity::SystemAssigned { role: RoleAssignment::default() }
        );

        let identity: VmIdentity =
            serde_json::from_str(r#"{"type": "None"}"#).unwrap();
        assert_eq!(identity, VmIdentity::None);

        assert!(serde_json::from_str::<VmIdentity>(r#"{"type": "UserAssigned"}"#)
            .is_err());
    }

    #[test]
    fn role_strings() {
        assert_eq!(MachineRole::ControlPlane.to_string(), "control-plane");
        assert_eq!(MachineRole::Node.to_string(), "node");
        serde_test::assert_tokens(
            &MachineRole::ControlPlane,
            &[serde_test::Token::UnitVariant {
                name: "MachineRole",
                variant: "control-plane",
            }],
        );
    }

    #[test]
    fn nic_names_from_machine() {
        let mut spec = MachineSpec::default();
        let vm = VmSpec::from_machine("node-0", MachineRole::Node, &spec);
        assert_eq!(vm.nic_names, vec!["node-0-nic".to_owned()]);

        spec.network_interfaces = vec![
            NetworkInterface {
                subnet_name: "a".to_owned(),
                private_ip_configs: 1,
                accelerated_networking: None,
            },
            NetworkInterface {
                subnet_name: "b".to_owned(),
                private_ip_configs: 1,
                accelerated_networking: Some(true),
            },
        ];
        let vm = VmSpec::from_machine("node-0", MachineRole::Node, &spec);
        assert_eq!(
            vm.nic_names,
            vec!["node-0-nic-0".to_owned(), "node-0-nic-1".to_owned()]
        );
        assert_eq!(vm.name, "node-0");
    }
}
