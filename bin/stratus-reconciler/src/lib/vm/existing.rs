// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembles the observed state of an existing VM from the VM, its primary
//! network interface, and that interface's public IPs.

use slog::debug;
use thiserror::Error;

use stratus_cloud::compute::{NetworkInterfaceReference, VirtualMachine};
use stratus_cloud::{name_from_id, ProviderError};
use stratus_types::{ObservedVm, VmAddress};

use super::VmService;
use crate::{converters, ErrorKind};

#[derive(Debug, Error)]
pub enum ExistingVmError {
    #[error("VM {name} not found: {source}")]
    NotFound {
        name: String,
        #[source]
        source: ProviderError,
    },

    /// A VM lookup failed for any other reason, or a lookup of one of its
    /// network interfaces or public IPs failed (for any reason).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("VM {name} refers to a resource by an unusable ID {id:?}")]
    InvalidReference { name: String, id: Option<String> },
}

impl ExistingVmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExistingVmError::NotFound { .. } => ErrorKind::NotFound,
            ExistingVmError::Provider(e) => ErrorKind::from(e),
            ExistingVmError::InvalidReference { .. } => ErrorKind::Validation,
        }
    }

    /// Returns `true` only if the VM itself does not exist. A missing
    /// dependent resource is not the same as a missing VM.
    pub fn is_vm_not_found(&self) -> bool {
        matches!(self, ExistingVmError::NotFound { .. })
    }
}

/// The interface flagged primary, or the only interface if there is just one.
fn primary_interface(
    vm: &VirtualMachine,
) -> Option<&NetworkInterfaceReference> {
    let interfaces = vm.network_interfaces();
    interfaces.iter().find(|nic| nic.is_primary()).or(match interfaces {
        [only] => Some(only),
        _ => None,
    })
}

fn referenced_name(
    vm_name: &str,
    id: Option<&str>,
) -> Result<String, ExistingVmError> {
    id.and_then(name_from_id).map(str::to_owned).ok_or_else(|| {
        ExistingVmError::InvalidReference {
            name: vm_name.to_owned(),
            id: id.map(str::to_owned),
        }
    })
}

impl VmService {
    /// Fetches the named VM and assembles its observed state.
    ///
    /// Addresses are reported per IP configuration of the primary network
    /// interface: the private address first, then the address of the bound
    /// public IP, if any. Any failure to fetch the interface or a public IP
    /// aborts the whole assembly.
    pub async fn get_existing(
        &self,
        name: &str,
    ) -> Result<ObservedVm, ExistingVmError> {
        let resource_group = self.scope.resource_group();

        let vm = self.vms.get(&resource_group, name).await.map_err(|source| {
            if source.is_not_found() {
                ExistingVmError::NotFound { name: name.to_owned(), source }
            } else {
                ExistingVmError::Provider(source)
            }
        })?;
        let mut observed = converters::observed_vm(&vm);

        let Some(primary) = primary_interface(&vm) else {
            debug!(self.log, "VM has no primary network interface";
                   "vm" => name, "resource_group" => &resource_group);
            return Ok(observed);
        };

        let nic_name = referenced_name(name, primary.id.as_deref())?;
        let nic = self.nics.get(&resource_group, &nic_name).await?;

        for config in nic.ip_configurations() {
            let Some(properties) = &config.properties else {
                continue;
            };

            if let Some(address) = &properties.private_ip_address {
                observed.addresses.push(VmAddress::internal(address.as_str()));
            }

            if let Some(public_ip) = &properties.public_ip_address {
                let ip_name = referenced_name(name, public_ip.id.as_deref())?;
                let ip = self.public_ips.get(&resource_group, &ip_name).await?;
                if let Some(address) = ip.ip_address() {
                    observed.addresses.push(VmAddress::external(address));
                }
            }
        }

        Ok(observed)
    }
}
