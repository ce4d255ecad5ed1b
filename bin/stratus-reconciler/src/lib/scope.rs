// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! What a reconciliation pass is working on.

use anyhow::anyhow;
use async_trait::async_trait;

use stratus_config::{Config, MachineConfig};
use stratus_types::{Image, Tags, VmSpec};

/// The surrounding context a [`crate::vm::VmService`] runs in: where the VMs
/// live, who owns them, and what they boot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VmScope: Send + Sync {
    fn resource_group(&self) -> String;
    fn location(&self) -> String;
    fn cluster_name(&self) -> String;

    /// Tags applied to every resource in the cluster.
    fn additional_tags(&self) -> Tags;

    /// The VMs to converge, in declaration order.
    fn vm_specs(&self) -> Vec<VmSpec>;

    async fn vm_image(&self) -> anyhow::Result<Image>;

    /// The payload handed to new VMs as custom data, unchanged.
    async fn bootstrap_data(&self) -> anyhow::Result<String>;
}

/// A scope for one machine declared in a configuration file.
#[derive(Clone, Debug)]
pub struct ConfigScope {
    resource_group: String,
    location: String,
    cluster_name: String,
    additional_tags: Tags,
    image: Option<Image>,
    bootstrap_data: String,
    vm_spec: VmSpec,
}

impl ConfigScope {
    /// Builds the scope for `machine`. The machine's own image, when set,
    /// takes precedence over the configuration-wide one.
    pub fn new(config: &Config, machine: &MachineConfig) -> Self {
        Self {
            resource_group: config.cluster.resource_group.clone(),
            location: config.cluster.location.clone(),
            cluster_name: config.cluster.name.clone(),
            additional_tags: config.cluster.additional_tags.clone(),
            image: machine.spec.image.clone().or_else(|| config.image.clone()),
            bootstrap_data: config.bootstrap_data.clone(),
            vm_spec: VmSpec::from_machine(
                machine.name.as_str(),
                machine.role,
                &machine.spec,
            ),
        }
    }

    pub fn vm_spec(&self) -> &VmSpec {
        &self.vm_spec
    }
}

#[async_trait]
impl VmScope for ConfigScope {
    fn resource_group(&self) -> String {
        self.resource_group.clone()
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn cluster_name(&self) -> String {
        self.cluster_name.clone()
    }

    fn additional_tags(&self) -> Tags {
        self.additional_tags.clone()
    }

    fn vm_specs(&self) -> Vec<VmSpec> {
        vec![self.vm_spec.clone()]
    }

    async fn vm_image(&self) -> anyhow::Result<Image> {
        self.image.clone().ok_or_else(|| {
            anyhow!("no image configured for machine {}", self.vm_spec.name)
        })
    }

    async fn bootstrap_data(&self) -> anyhow::Result<String> {
        if self.bootstrap_data.is_empty() {
            return Err(anyhow!("bootstrap data is not yet available"));
        }
        Ok(self.bootstrap_data.clone())
    }
}
