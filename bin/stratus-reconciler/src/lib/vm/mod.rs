// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convergence of a scope's VMs toward their declared specs.
//!
//! [`VmService::reconcile`] creates every declared VM that doesn't exist yet
//! and leaves existing ones alone; [`VmService::delete`] removes them. Specs
//! are processed one at a time, in declaration order, and a failure on one
//! spec doesn't stop the others from being attempted.

use std::fmt;
use std::sync::Arc;

use slog::{debug, info, warn, Logger};
use thiserror::Error;

use stratus_cloud::compute::VirtualMachine;
use stratus_cloud::{
    NetworkInterfacesClient, ProviderError, PublicIpAddressesClient,
    VirtualMachinesClient,
};
use stratus_types::VmSpec;

use crate::scope::VmScope;
use crate::ErrorKind;

pub mod desired;
pub mod existing;

pub use desired::DesiredVmError;
pub use existing::ExistingVmError;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("failed to get VM {name}: {source}")]
    Get {
        name: String,
        #[source]
        source: ExistingVmError,
    },

    #[error("failed to build VM {name}: {source}")]
    Desired {
        name: String,
        #[source]
        source: DesiredVmError,
    },

    #[error("failed to create VM {name} in resource group {resource_group}: {source}")]
    Create {
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to delete VM {name} in resource group {resource_group}: {source}")]
    Delete {
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },
}

impl VmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VmError::Get { source, .. } => source.kind(),
            VmError::Desired { source, .. } => source.kind(),
            VmError::Create { source, .. } | VmError::Delete { source, .. } => {
                ErrorKind::from(source)
            }
        }
    }

    /// The name of the VM the error is about.
    pub fn vm_name(&self) -> &str {
        match self {
            VmError::Get { name, .. }
            | VmError::Desired { name, .. }
            | VmError::Create { name, .. }
            | VmError::Delete { name, .. } => name,
        }
    }
}

/// Every per-spec failure from one [`VmService::reconcile`] or
/// [`VmService::delete`] call, in declaration order. Never empty.
#[derive(Debug)]
pub struct VmErrors(Vec<VmError>);

impl VmErrors {
    pub fn iter(&self) -> impl Iterator<Item = &VmError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<VmError> {
        self.0
    }

    fn check(errors: Vec<VmError>) -> Result<(), VmErrors> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VmErrors(errors))
        }
    }
}

impl fmt::Display for VmErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VmErrors {}

/// Converges the VMs of one [`VmScope`].
pub struct VmService {
    scope: Arc<dyn VmScope>,
    vms: Arc<dyn VirtualMachinesClient>,
    nics: Arc<dyn NetworkInterfacesClient>,
    public_ips: Arc<dyn PublicIpAddressesClient>,
    log: Logger,
}

impl VmService {
    pub fn new(
        scope: Arc<dyn VmScope>,
        vms: Arc<dyn VirtualMachinesClient>,
        nics: Arc<dyn NetworkInterfacesClient>,
        public_ips: Arc<dyn PublicIpAddressesClient>,
        log: Logger,
    ) -> Self {
        Self { scope, vms, nics, public_ips, log }
    }

    /// Creates every declared VM that doesn't exist yet.
    ///
    /// VMs that already exist are considered converged; they are never
    /// updated in place.
    pub async fn reconcile(&self) -> Result<(), VmErrors> {
        let mut errors = Vec::new();
        for spec in self.scope.vm_specs() {
            if let Err(e) = self.reconcile_one(&spec).await {
                warn!(self.log, "failed to reconcile VM";
                      "vm" => &spec.name, "error" => %e);
                errors.push(e);
            }
        }
        VmErrors::check(errors)
    }

    /// Deletes every declared VM. VMs that are already gone are not an
    /// error.
    pub async fn delete(&self) -> Result<(), VmErrors> {
        let resource_group = self.scope.resource_group();
        let mut errors = Vec::new();
        for spec in self.scope.vm_specs() {
            info!(self.log, "deleting VM";
                  "vm" => &spec.name, "resource_group" => &resource_group);
            match self.vms.delete(&resource_group, &spec.name).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(self.log, "VM already deleted";
                           "vm" => &spec.name,
                           "resource_group" => &resource_group);
                }
                Err(source) => errors.push(VmError::Delete {
                    name: spec.name.clone(),
                    resource_group: resource_group.clone(),
                    source,
                }),
            }
        }
        VmErrors::check(errors)
    }

    async fn reconcile_one(&self, spec: &VmSpec) -> Result<(), VmError> {
        let resource_group = self.scope.resource_group();

        match self.get_existing(&spec.name).await {
            Ok(observed) => {
                debug!(self.log, "VM already exists";
                       "vm" => &spec.name,
                       "resource_group" => &resource_group,
                       "state" => %observed.state);
                return Ok(());
            }
            Err(e) if e.is_vm_not_found() => {}
            Err(source) => {
                return Err(VmError::Get { name: spec.name.clone(), source });
            }
        }

        let vm = self.desired_vm(spec).await.map_err(|source| {
            VmError::Desired { name: spec.name.clone(), source }
        })?;

        info!(self.log, "creating VM";
              "vm" => &spec.name, "resource_group" => &resource_group);
        self.vms
            .create_or_update(&resource_group, &spec.name, vm)
            .await
            .map_err(|source| VmError::Create {
                name: spec.name.clone(),
                resource_group,
                source,
            })?;

        Ok(())
    }

    /// Resolves what the VM request body depends on and builds it.
    async fn desired_vm(
        &self,
        spec: &VmSpec,
    ) -> Result<VirtualMachine, DesiredVmError> {
        let resource_group = self.scope.resource_group();

        let mut nic_ids = Vec::with_capacity(spec.nic_names.len());
        for name in &spec.nic_names {
            let nic = self.nics.get(&resource_group, name).await.map_err(
                |source| DesiredVmError::NetworkInterface {
                    name: name.clone(),
                    source,
                },
            )?;
            let id = nic.id.ok_or_else(|| {
                DesiredVmError::MissingInterfaceId(name.clone())
            })?;
            nic_ids.push(id);
        }

        let image =
            self.scope.vm_image().await.map_err(DesiredVmError::Image)?;
        let bootstrap_data = self
            .scope
            .bootstrap_data()
            .await
            .map_err(DesiredVmError::BootstrapData)?;

        desired::build(desired::DesiredVm {
            spec,
            location: &self.scope.location(),
            cluster_name: &self.scope.cluster_name(),
            additional_tags: &self.scope.additional_tags(),
            image: &image,
            bootstrap_data: &bootstrap_data,
            nic_ids: &nic_ids,
        })
    }
}
