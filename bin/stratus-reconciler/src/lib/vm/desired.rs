// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of the provider request body for a VM that doesn't exist
//! yet.

use base64::Engine;
use thiserror::Error;

use stratus_cloud::compute::{
    CachingTypes, DataDisk, DiskCreateOption, EvictionPolicy, HardwareProfile,
    ImageReference, LinuxConfiguration, ManagedDiskParameters,
    NetworkInterfaceReference, NetworkInterfaceReferenceProperties,
    NetworkProfile, OsDisk, OsProfile, Plan, Priority, ResourceIdentityType,
    SshConfiguration, SshPublicKey, StorageProfile, UserAssignedIdentityValue,
    VirtualMachine, VirtualMachineIdentity, VirtualMachineProperties,
};
use stratus_cloud::ProviderError;
use stratus_types::tags::{self, BuildParams, ResourceLifecycle};
use stratus_types::{
    CachingType, Image, Tags, VmIdentity, VmSpec, ADMIN_USERNAME,
};

use crate::ErrorKind;

#[derive(Debug, Error)]
pub enum DesiredVmError {
    #[error("failed to get network interface {name}: {source}")]
    NetworkInterface {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("network interface {0} has no ID")]
    MissingInterfaceId(String),

    #[error("failed to get VM image: {0}")]
    Image(#[source] anyhow::Error),

    #[error("failed to retrieve bootstrap data: {0}")]
    BootstrapData(#[source] anyhow::Error),

    #[error("SSH public key is not valid base64: {0}")]
    InvalidSshKey(#[source] base64::DecodeError),

    #[error("data disk {0} has no LUN")]
    MissingLun(String),
}

impl DesiredVmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DesiredVmError::NetworkInterface { source, .. } => {
                ErrorKind::from(source)
            }
            DesiredVmError::Image(_) | DesiredVmError::BootstrapData(_) => {
                ErrorKind::Provider
            }
            DesiredVmError::MissingInterfaceId(_)
            | DesiredVmError::InvalidSshKey(_)
            | DesiredVmError::MissingLun(_) => ErrorKind::Validation,
        }
    }
}

/// Everything a VM request body is derived from, with the provider lookups
/// already resolved.
pub struct DesiredVm<'a> {
    pub spec: &'a VmSpec,
    pub location: &'a str,
    pub cluster_name: &'a str,
    pub additional_tags: &'a Tags,
    pub image: &'a Image,

    /// Passed to the provider as-is.
    pub bootstrap_data: &'a str,

    /// Provider IDs of the spec's network interfaces, in the same order as
    /// `spec.nic_names`.
    pub nic_ids: &'a [String],
}

fn caching(caching: Option<CachingType>) -> Option<CachingTypes> {
    caching.map(|c| match c {
        CachingType::None => CachingTypes::None,
        CachingType::ReadOnly => CachingTypes::ReadOnly,
        CachingType::ReadWrite => CachingTypes::ReadWrite,
    })
}

fn managed_disk(
    params: Option<&stratus_types::ManagedDiskParameters>,
) -> Option<ManagedDiskParameters> {
    params.map(|p| ManagedDiskParameters {
        storage_account_type: Some(p.storage_account_type.clone()),
    })
}

fn image_reference(image: &Image) -> (ImageReference, Option<Plan>) {
    match image {
        Image::Id(id) => {
            let reference =
                ImageReference { id: Some(id.clone()), ..Default::default() };
            (reference, None)
        }
        Image::SharedGallery(gallery) => (
            ImageReference {
                id: Some(gallery.resource_id()),
                ..Default::default()
            },
            None,
        ),
        Image::Marketplace(m) => {
            let reference = ImageReference {
                id: None,
                publisher: Some(m.publisher.clone()),
                offer: Some(m.offer.clone()),
                sku: Some(m.sku.clone()),
                version: Some(m.version.clone()),
            };
            let plan = m.third_party_image.then(|| Plan {
                name: Some(m.sku.clone()),
                publisher: Some(m.publisher.clone()),
                product: Some(m.offer.clone()),
            });
            (reference, plan)
        }
    }
}

fn storage_profile(
    spec: &VmSpec,
    image: ImageReference,
) -> Result<StorageProfile, DesiredVmError> {
    let os_disk = OsDisk {
        name: Some(format!("{}_OSDisk", spec.name)),
        os_type: Some(spec.os_disk.os_type.clone())
            .filter(|os_type| !os_type.is_empty()),
        create_option: DiskCreateOption::FromImage,
        disk_size_gb: spec.os_disk.disk_size_gb,
        caching: caching(spec.os_disk.caching_type),
        managed_disk: managed_disk(spec.os_disk.managed_disk.as_ref()),
    };

    let data_disks = spec
        .data_disks
        .iter()
        .map(|disk| {
            let lun = disk.lun.ok_or_else(|| {
                DesiredVmError::MissingLun(disk.name_suffix.clone())
            })?;
            Ok(DataDisk {
                name: Some(format!("{}_{}", spec.name, disk.name_suffix)),
                lun,
                create_option: DiskCreateOption::Empty,
                disk_size_gb: Some(disk.disk_size_gb),
                caching: caching(disk.caching_type),
                managed_disk: managed_disk(disk.managed_disk.as_ref()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StorageProfile {
        image_reference: Some(image),
        os_disk: Some(os_disk),
        data_disks,
    })
}

fn os_profile(
    spec: &VmSpec,
    bootstrap_data: &str,
) -> Result<OsProfile, DesiredVmError> {
    let linux_configuration = if spec.ssh_key_data.is_empty() {
        None
    } else {
        let key = base64::engine::general_purpose::STANDARD
            .decode(&spec.ssh_key_data)
            .map_err(DesiredVmError::InvalidSshKey)?;
        let key_data = String::from_utf8_lossy(&key).into_owned();
        Some(LinuxConfiguration {
            disable_password_authentication: Some(true),
            ssh: Some(SshConfiguration {
                public_keys: vec![SshPublicKey {
                    path: format!(
                        "/home/{ADMIN_USERNAME}/.ssh/authorized_keys"
                    ),
                    key_data,
                }],
            }),
        })
    };

    Ok(OsProfile {
        computer_name: Some(spec.name.clone()),
        admin_username: Some(ADMIN_USERNAME.to_owned()),
        custom_data: Some(bootstrap_data.to_owned()),
        linux_configuration,
    })
}

fn identity(identity: &VmIdentity) -> Option<VirtualMachineIdentity> {
    match identity {
        VmIdentity::None => None,
        VmIdentity::SystemAssigned { .. } => Some(VirtualMachineIdentity {
            kind: ResourceIdentityType::SystemAssigned,
            principal_id: None,
            user_assigned_identities: Default::default(),
        }),
        VmIdentity::UserAssigned { identities } => {
            Some(VirtualMachineIdentity {
                kind: ResourceIdentityType::UserAssigned,
                principal_id: None,
                user_assigned_identities: identities
                    .iter()
                    .map(|id| {
                        (
                            id.provider_id.clone(),
                            UserAssignedIdentityValue::default(),
                        )
                    })
                    .collect(),
            })
        }
    }
}

/// Builds the request body that creates `desired.spec`'s VM.
pub fn build(desired: DesiredVm<'_>) -> Result<VirtualMachine, DesiredVmError> {
    let spec = desired.spec;

    let mut additional = desired.additional_tags.clone();
    additional.extend(
        spec.additional_tags.iter().map(|(k, v)| (k.clone(), v.clone())),
    );
    let role = spec.role.to_string();
    let tags = tags::build(BuildParams {
        cluster_name: desired.cluster_name,
        lifecycle: ResourceLifecycle::Owned,
        name: Some(&spec.name),
        role: Some(&role),
        additional: &additional,
    });

    let (image_reference, plan) = image_reference(desired.image);

    let network_interfaces = desired
        .nic_ids
        .iter()
        .enumerate()
        .map(|(i, id)| NetworkInterfaceReference {
            id: Some(id.clone()),
            properties: Some(NetworkInterfaceReferenceProperties {
                primary: Some(i == 0),
            }),
        })
        .collect();

    let spot = spec.spot_vm_options.is_some();

    Ok(VirtualMachine {
        id: None,
        name: None,
        location: Some(desired.location.to_owned()),
        tags,
        zones: spec.zone.iter().cloned().collect(),
        identity: identity(&spec.identity),
        plan,
        properties: Some(VirtualMachineProperties {
            hardware_profile: Some(HardwareProfile {
                vm_size: Some(spec.size.clone()),
            }),
            storage_profile: Some(storage_profile(spec, image_reference)?),
            os_profile: Some(os_profile(spec, desired.bootstrap_data)?),
            network_profile: Some(NetworkProfile { network_interfaces }),
            priority: spot.then_some(Priority::Spot),
            eviction_policy: spot.then_some(EvictionPolicy::Deallocate),
            billing_profile: None,
            provisioning_state: None,
        }),
    })
}
