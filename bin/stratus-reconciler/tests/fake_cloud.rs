// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drives the VM service against the in-memory provider.

use std::sync::Arc;

use http::StatusCode;
use slog::Logger;

use stratus_cloud::fake::{FakeCloud, Operation, ResourceKind};
use stratus_cloud::network::{
    IpConfiguration, IpConfigurationProperties, NetworkInterface,
    NetworkInterfaceProperties, PublicIpAddress, SubResource,
};
use stratus_cloud::{
    NetworkInterfacesClient, ProviderError, PublicIpAddressesClient,
};
use stratus_config::{ClusterConfig, Config, MachineConfig};
use stratus_reconciler::scope::ConfigScope;
use stratus_reconciler::vm::VmService;
use stratus_reconciler::ErrorKind;
use stratus_types::{AddressKind, Image, MachineRole, MachineSpec};

const RESOURCE_GROUP: &str = "my-rg";

fn logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

fn config() -> Config {
    let mut config = Config::new(
        ClusterConfig {
            name: "my-cluster".to_owned(),
            namespace: "default".to_owned(),
            resource_group: RESOURCE_GROUP.to_owned(),
            location: "westus2".to_owned(),
            subscription_id: "123".to_owned(),
            ..Default::default()
        },
        vec![MachineConfig {
            name: "my-vm".to_owned(),
            role: MachineRole::Node,
            spec: MachineSpec {
                vm_size: "Standard_D2s_v3".to_owned(),
                ..Default::default()
            },
        }],
    );
    config.image = Some(Image::Id("/images/base".to_owned()));
    config.bootstrap_data = "I2Nsb3VkLWNvbmZpZwo=".to_owned();
    config
}

/// Creates `my-vm-nic` with one IP configuration, optionally bound to a
/// public IP.
async fn seed(cloud: &FakeCloud, public_ip: Option<&str>) {
    let public_ip_address = match public_ip {
        Some(name) => {
            let ip = PublicIpAddressesClient::create_or_update(
                cloud,
                RESOURCE_GROUP,
                name,
                PublicIpAddress::default(),
            )
            .await
            .unwrap();
            Some(SubResource { id: ip.id })
        }
        None => None,
    };

    let nic = NetworkInterface {
        properties: Some(NetworkInterfaceProperties {
            ip_configurations: vec![IpConfiguration {
                properties: Some(IpConfigurationProperties {
                    public_ip_address,
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    };
    NetworkInterfacesClient::create_or_update(
        cloud,
        RESOURCE_GROUP,
        "my-vm-nic",
        nic,
    )
    .await
    .unwrap();
}

fn service(cloud: &Arc<FakeCloud>) -> VmService {
    let config = config();
    let scope = ConfigScope::new(&config, &config.machines[0]);
    VmService::new(
        Arc::new(scope),
        cloud.clone(),
        cloud.clone(),
        cloud.clone(),
        logger(),
    )
}

#[tokio::test]
async fn reconcile_is_create_once() {
    let cloud = Arc::new(FakeCloud::new("123"));
    seed(&cloud, None).await;
    let svc = service(&cloud);

    svc.reconcile().await.unwrap();
    svc.reconcile().await.unwrap();

    let calls = cloud.calls().await;
    assert_eq!(
        calls.get(ResourceKind::VirtualMachine, Operation::CreateOrUpdate),
        1
    );

    let vms = cloud.virtual_machines().await;
    assert_eq!(vms.len(), 1);
    let nic_id = cloud
        .resource_id(
            ResourceKind::NetworkInterface,
            RESOURCE_GROUP,
            "my-vm-nic",
        )
        .to_string();
    assert_eq!(vms[0].network_interfaces()[0].id.as_deref(), Some(&*nic_id));
}

#[tokio::test]
async fn observed_addresses_follow_the_primary_interface() {
    let cloud = Arc::new(FakeCloud::new("123"));
    seed(&cloud, Some("my-vm-ip")).await;
    let svc = service(&cloud);
    svc.reconcile().await.unwrap();

    let observed = svc.get_existing("my-vm").await.unwrap();
    let kinds: Vec<_> = observed.addresses.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AddressKind::InternalIp, AddressKind::ExternalIp]);
    assert!(observed.addresses[1].address.starts_with("20.0.0."));
}

#[tokio::test]
async fn public_ip_failure_aborts_assembly_without_recreating() {
    let cloud = Arc::new(FakeCloud::new("123"));
    seed(&cloud, Some("my-vm-ip")).await;
    let svc = service(&cloud);
    svc.reconcile().await.unwrap();

    cloud
        .inject_failure(
            ResourceKind::PublicIpAddress,
            Operation::Get,
            "my-vm-ip",
            ProviderError::not_found("#: Not found"),
        )
        .await;

    let err = svc.get_existing("my-vm").await.unwrap_err();
    assert!(!err.is_vm_not_found());
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let errors = svc.reconcile().await.unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        cloud
            .calls()
            .await
            .get(ResourceKind::VirtualMachine, Operation::CreateOrUpdate),
        1
    );
}

#[tokio::test]
async fn create_failure_is_reported_then_retried() {
    let cloud = Arc::new(FakeCloud::new("123"));
    seed(&cloud, None).await;
    let svc = service(&cloud);

    cloud
        .inject_failure(
            ResourceKind::VirtualMachine,
            Operation::CreateOrUpdate,
            "my-vm",
            ProviderError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "#: Internal Server Error",
            ),
        )
        .await;
    let errors = svc.reconcile().await.unwrap_err();
    assert_eq!(
        errors.to_string(),
        "failed to create VM my-vm in resource group my-rg: \
         #: Internal Server Error: StatusCode=500"
    );
    assert!(cloud.virtual_machines().await.is_empty());

    cloud.clear_failures().await;
    svc.reconcile().await.unwrap();
    assert_eq!(cloud.virtual_machines().await.len(), 1);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let cloud = Arc::new(FakeCloud::new("123"));
    seed(&cloud, None).await;
    let svc = service(&cloud);
    svc.reconcile().await.unwrap();

    svc.delete().await.unwrap();
    svc.delete().await.unwrap();
    assert!(cloud.virtual_machines().await.is_empty());
    assert!(svc.get_existing("my-vm").await.unwrap_err().is_vm_not_found());
}
