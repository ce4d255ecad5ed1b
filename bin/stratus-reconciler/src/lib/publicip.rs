// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Public IPs owned by a cluster.

use std::sync::Arc;

use slog::{debug, info, warn, Logger};
use thiserror::Error;

use stratus_cloud::network::{
    IpAllocationMethod, IpVersion, PublicIpAddress, PublicIpAddressDnsSettings,
    PublicIpAddressProperties, PublicIpAddressSku, PublicIpAddressSkuName,
};
use stratus_cloud::{ProviderError, PublicIpAddressesClient};
use stratus_config::{Config, PublicIpConfig};
use stratus_types::tags::{self, BuildParams, ResourceLifecycle};
use stratus_types::{IpTag, Tags};

use crate::{converters, ErrorKind};

/// Everything needed to create one public IP.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicIpSpec {
    pub name: String,
    pub resource_group: String,
    pub cluster_name: String,
    pub dns_name: String,
    pub is_ipv6: bool,
    pub location: String,
    pub failure_domains: Vec<String>,
    pub additional_tags: Tags,
    pub ip_tags: Vec<IpTag>,
}

impl PublicIpSpec {
    pub fn from_config(config: &Config, ip: &PublicIpConfig) -> Self {
        Self {
            name: ip.name.clone(),
            resource_group: config.cluster.resource_group.clone(),
            cluster_name: config.cluster.name.clone(),
            dns_name: ip.dns_name.clone(),
            is_ipv6: ip.ipv6,
            location: config.cluster.location.clone(),
            failure_domains: Vec::new(),
            additional_tags: config.cluster.additional_tags.clone(),
            ip_tags: ip.ip_tags.clone(),
        }
    }

    /// Returns the request body that creates this public IP, or `None` if
    /// `existing` shows it has already been created.
    ///
    /// DNS settings are only set when a DNS name is; the domain name label is
    /// the DNS name's first label.
    pub fn parameters(
        &self,
        existing: Option<&PublicIpAddress>,
    ) -> Option<PublicIpAddress> {
        if existing.is_some() {
            return None;
        }

        let version =
            if self.is_ipv6 { IpVersion::IPv6 } else { IpVersion::IPv4 };

        let dns_settings = (!self.dns_name.is_empty()).then(|| {
            let label = self.dns_name.split('.').next().unwrap_or_default();
            PublicIpAddressDnsSettings {
                domain_name_label: Some(label.to_owned()),
                fqdn: Some(self.dns_name.clone()),
            }
        });

        Some(PublicIpAddress {
            id: None,
            name: Some(self.name.clone()),
            location: Some(self.location.clone()),
            tags: tags::build(BuildParams {
                cluster_name: &self.cluster_name,
                lifecycle: ResourceLifecycle::Owned,
                name: Some(&self.name),
                role: None,
                additional: &self.additional_tags,
            }),
            zones: self.failure_domains.clone(),
            sku: Some(PublicIpAddressSku {
                name: Some(PublicIpAddressSkuName::Standard),
            }),
            properties: Some(PublicIpAddressProperties {
                public_ip_address_version: Some(version),
                public_ip_allocation_method: Some(IpAllocationMethod::Static),
                dns_settings,
                ip_tags: converters::ip_tags(&self.ip_tags),
                ip_address: None,
                provisioning_state: None,
            }),
        })
    }
}

#[derive(Debug, Error)]
pub enum PublicIpError {
    #[error("failed to get public IP {name} in resource group {resource_group}: {source}")]
    Get {
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to create public IP {name} in resource group {resource_group}: {source}")]
    Create {
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to delete public IP {name} in resource group {resource_group}: {source}")]
    Delete {
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },
}

impl PublicIpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublicIpError::Get { source, .. }
            | PublicIpError::Create { source, .. }
            | PublicIpError::Delete { source, .. } => ErrorKind::from(source),
        }
    }
}

/// Creates and deletes public IPs.
pub struct PublicIpService {
    public_ips: Arc<dyn PublicIpAddressesClient>,
    log: Logger,
}

impl PublicIpService {
    pub fn new(
        public_ips: Arc<dyn PublicIpAddressesClient>,
        log: Logger,
    ) -> Self {
        Self { public_ips, log }
    }

    /// Creates each public IP in `specs` that doesn't exist yet. Every spec is
    /// attempted; the first failure is returned.
    pub async fn reconcile(
        &self,
        specs: &[PublicIpSpec],
    ) -> Result<(), PublicIpError> {
        let mut result = Ok(());
        for spec in specs {
            if let Err(e) = self.reconcile_one(spec).await {
                warn!(self.log, "failed to reconcile public IP";
                      "public_ip" => &spec.name, "error" => %e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    async fn reconcile_one(
        &self,
        spec: &PublicIpSpec,
    ) -> Result<(), PublicIpError> {
        let existing =
            match self.public_ips.get(&spec.resource_group, &spec.name).await {
                Ok(ip) => Some(ip),
                Err(e) if e.is_not_found() => None,
                Err(source) => {
                    return Err(PublicIpError::Get {
                        name: spec.name.clone(),
                        resource_group: spec.resource_group.clone(),
                        source,
                    })
                }
            };

        let Some(params) = spec.parameters(existing.as_ref()) else {
            debug!(self.log, "public IP already exists";
                   "public_ip" => &spec.name,
                   "resource_group" => &spec.resource_group);
            return Ok(());
        };

        info!(self.log, "creating public IP";
              "public_ip" => &spec.name,
              "resource_group" => &spec.resource_group);
        self.public_ips
            .create_or_update(&spec.resource_group, &spec.name, params)
            .await
            .map_err(|source| PublicIpError::Create {
                name: spec.name.clone(),
                resource_group: spec.resource_group.clone(),
                source,
            })?;
        Ok(())
    }

    /// Deletes each public IP in `specs`. IPs that are already gone are not
    /// an error. Every spec is attempted; the first failure is returned.
    pub async fn delete(
        &self,
        specs: &[PublicIpSpec],
    ) -> Result<(), PublicIpError> {
        let mut result = Ok(());
        for spec in specs {
            info!(self.log, "deleting public IP";
                  "public_ip" => &spec.name,
                  "resource_group" => &spec.resource_group);
            match self.public_ips.delete(&spec.resource_group, &spec.name).await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(source) => {
                    let e = PublicIpError::Delete {
                        name: spec.name.clone(),
                        resource_group: spec.resource_group.clone(),
                        source,
                    };
                    warn!(self.log, "failed to delete public IP";
                          "public_ip" => &spec.name, "error" => %e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }
}
