// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The operations behind the command-line driver.

use std::sync::Arc;

use anyhow::Context;
use serde_derive::Serialize;
use slog::{info, Logger};

use stratus_cloud::fake::FakeCloud;
use stratus_cloud::network::{
    IpConfiguration, IpConfigurationProperties, NetworkInterface,
    NetworkInterfaceProperties,
};
use stratus_cloud::{
    NetworkInterfacesClient, ProviderError, VirtualMachinesClient,
};
use stratus_config::{Config, MachineConfig};
use stratus_types::ObservedVm;

use crate::converters::{self, VmInstance};
use crate::publicip::{PublicIpService, PublicIpSpec};
use crate::scope::ConfigScope;
use crate::subscription::{get_subscription_id, ConfigOwnerLookup};
use crate::vm::VmService;

/// Resolves the cluster's subscription and applies every defaulting routine
/// to each machine.
pub async fn normalize(
    mut config: Config,
    log: &Logger,
) -> anyhow::Result<Config> {
    let lookup = ConfigOwnerLookup::new([&config.cluster]);
    let subscription_id = get_subscription_id(
        &lookup,
        &config.cluster.name,
        &config.cluster.namespace,
        config.engine.subscription_attempts,
        config.engine.subscription_retry_interval(),
        log,
    )
    .await?;

    for machine in &mut config.machines {
        machine.spec.set_defaults(&subscription_id).with_context(|| {
            format!("normalizing machine {}", machine.name)
        })?;
    }
    info!(log, "normalized machines";
          "count" => config.machines.len(),
          "subscription" => &subscription_id);
    Ok(config)
}

/// What one machine looks like after a simulated run.
#[derive(Debug, Serialize)]
pub struct SimulatedMachine {
    pub name: String,
    pub observed: Option<ObservedVm>,
    pub instance: Option<VmInstance>,
}

#[derive(Debug, Default, Serialize)]
pub struct SimulationReport {
    pub machines: Vec<SimulatedMachine>,
    pub public_ips: Vec<String>,
    pub errors: Vec<String>,
}

/// Creates a machine's network interfaces, which the VM service expects to
/// exist already.
async fn seed_network_interfaces(
    cloud: &FakeCloud,
    config: &Config,
    machine: &MachineConfig,
    scope: &ConfigScope,
) -> Result<(), ProviderError> {
    for (i, name) in scope.vm_spec().nic_names.iter().enumerate() {
        let declared = machine.spec.network_interfaces.get(i);
        let ip_configs =
            declared.map_or(1, |nic| nic.private_ip_configs.max(1));
        let nic = NetworkInterface {
            location: Some(config.cluster.location.clone()),
            properties: Some(NetworkInterfaceProperties {
                ip_configurations: (0..ip_configs)
                    .map(|j| IpConfiguration {
                        properties: Some(IpConfigurationProperties {
                            primary: Some(j == 0),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
                enable_accelerated_networking: declared
                    .and_then(|nic| nic.accelerated_networking),
                ..Default::default()
            }),
            ..Default::default()
        };
        NetworkInterfacesClient::create_or_update(
            cloud,
            &config.cluster.resource_group,
            name,
            nic,
        )
        .await?;
    }
    Ok(())
}

/// Normalizes `config` and converges it against an in-memory provider,
/// optionally deleting everything again afterwards.
///
/// Per-resource failures are collected into the report rather than
/// returned.
pub async fn simulate(
    config: Config,
    delete: bool,
    log: &Logger,
) -> anyhow::Result<SimulationReport> {
    let config = normalize(config, log).await?;
    let cloud =
        Arc::new(FakeCloud::new(config.cluster.subscription_id.as_str()));
    let mut report = SimulationReport::default();

    let ip_specs: Vec<_> = config
        .public_ips
        .iter()
        .map(|ip| PublicIpSpec::from_config(&config, ip))
        .collect();
    let ips = PublicIpService::new(
        cloud.clone(),
        log.new(slog::o!("component" => "public_ip")),
    );
    if let Err(e) = ips.reconcile(&ip_specs).await {
        report.errors.push(e.to_string());
    }

    let mut services = Vec::with_capacity(config.machines.len());
    for machine in &config.machines {
        let scope = Arc::new(ConfigScope::new(&config, machine));
        seed_network_interfaces(&cloud, &config, machine, &scope)
            .await
            .with_context(|| {
                format!("seeding interfaces for machine {}", machine.name)
            })?;

        let service = VmService::new(
            scope,
            cloud.clone(),
            cloud.clone(),
            cloud.clone(),
            log.new(slog::o!("machine" => machine.name.clone())),
        );
        if let Err(errors) = service.reconcile().await {
            report.errors.extend(errors.iter().map(|e| e.to_string()));
        }
        services.push((machine.name.as_str(), service));
    }

    if delete {
        for (_, service) in &services {
            if let Err(errors) = service.delete().await {
                report.errors.extend(errors.iter().map(|e| e.to_string()));
            }
        }
        if let Err(e) = ips.delete(&ip_specs).await {
            report.errors.push(e.to_string());
        }
    }

    for (name, service) in &services {
        let observed = service.get_existing(name).await.ok();
        let instance = VirtualMachinesClient::get(
            cloud.as_ref(),
            &config.cluster.resource_group,
            name,
        )
        .await
        .ok()
        .as_ref()
        .map(converters::vm_instance);
        report.machines.push(SimulatedMachine {
            name: (*name).to_owned(),
            observed,
            instance,
        });
    }

    for spec in &ip_specs {
        let found = stratus_cloud::PublicIpAddressesClient::get(
            cloud.as_ref(),
            &spec.resource_group,
            &spec.name,
        )
        .await;
        if let Ok(ip) = found {
            report
                .public_ips
                .push(ip.ip_address().unwrap_or_default().to_owned());
        }
    }

    Ok(report)
}
