// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory provider.
//!
//! [`FakeCloud`] implements every client trait over plain maps. It assigns
//! resource IDs, private and public addresses, and a `Succeeded`
//! provisioning state to whatever is created through it, and counts calls so
//! callers can check what was issued.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::compute::VirtualMachine;
use crate::network::{NetworkInterface, PublicIpAddress};
use crate::{
    NetworkInterfacesClient, ProviderError, PublicIpAddressesClient,
    ResourceId, VirtualMachinesClient,
};

const SUCCEEDED: &str = "Succeeded";

/// The kinds of resource the fake stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceKind {
    VirtualMachine,
    NetworkInterface,
    PublicIpAddress,
}

impl ResourceKind {
    fn namespace(self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "Microsoft.Compute",
            ResourceKind::NetworkInterface
            | ResourceKind::PublicIpAddress => "Microsoft.Network",
        }
    }

    fn resource_type(self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "virtualMachines",
            ResourceKind::NetworkInterface => "networkInterfaces",
            ResourceKind::PublicIpAddress => "publicIPAddresses",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Get,
    CreateOrUpdate,
    Delete,
}

/// Number of calls issued against the fake, per resource kind and operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCounts(BTreeMap<(ResourceKind, Operation), usize>);

impl CallCounts {
    pub fn get(&self, kind: ResourceKind, op: Operation) -> usize {
        self.0.get(&(kind, op)).copied().unwrap_or(0)
    }
}

type Key = (String, String);

/// Host bits of the /8 networks addresses are handed out from.
const HOST_MASK: u32 = 0x00ff_ffff;

const PRIVATE_NETWORK: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 0);
const PUBLIC_NETWORK: Ipv4Addr = Ipv4Addr::new(20, 0, 0, 0);

#[derive(Default)]
struct Inner {
    vms: BTreeMap<Key, VirtualMachine>,
    nics: BTreeMap<Key, NetworkInterface>,
    public_ips: BTreeMap<Key, PublicIpAddress>,
    failures: BTreeMap<(ResourceKind, Operation, String), ProviderError>,
    calls: CallCounts,
    next_host: u32,
}

impl Inner {
    /// Records a call and returns the failure injected for it, if any.
    fn call(
        &mut self,
        kind: ResourceKind,
        op: Operation,
        name: &str,
    ) -> Result<(), ProviderError> {
        *self.calls.0.entry((kind, op)).or_default() += 1;
        match self.failures.get(&(kind, op, name.to_owned())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Returns the next host address in `network`'s /8. Host numbers skip
    /// the network and broadcast addresses and wrap once exhausted.
    fn next_address(&mut self, network: Ipv4Addr) -> Ipv4Addr {
        self.next_host = self.next_host % (HOST_MASK - 1) + 1;
        Ipv4Addr::from(u32::from(network) & !HOST_MASK | self.next_host)
    }
}

fn not_found(
    kind: ResourceKind,
    resource_group: &str,
    name: &str,
) -> ProviderError {
    ProviderError::not_found(format!(
        "The Resource '{}/{}/{}' under resource group '{}' was not found",
        kind.namespace(),
        kind.resource_type(),
        name,
        resource_group
    ))
}

fn key(resource_group: &str, name: &str) -> Key {
    (resource_group.to_owned(), name.to_owned())
}

pub struct FakeCloud {
    subscription_id: String,
    inner: Mutex<Inner>,
}

impl FakeCloud {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns the ID the fake assigns to a resource.
    pub fn resource_id(
        &self,
        kind: ResourceKind,
        resource_group: &str,
        name: &str,
    ) -> ResourceId {
        ResourceId::new(
            self.subscription_id.as_str(),
            resource_group,
            kind.namespace(),
            kind.resource_type(),
            name,
        )
    }

    /// Makes every future `op` on the named resource fail with `err`.
    pub async fn inject_failure(
        &self,
        kind: ResourceKind,
        op: Operation,
        name: &str,
        err: ProviderError,
    ) {
        self.inner.lock().await.failures.insert((kind, op, name.to_owned()), err);
    }

    pub async fn clear_failures(&self) {
        self.inner.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> CallCounts {
        self.inner.lock().await.calls.clone()
    }

    pub async fn virtual_machines(&self) -> Vec<VirtualMachine> {
        self.inner.lock().await.vms.values().cloned().collect()
    }
}

#[async_trait]
impl VirtualMachinesClient for FakeCloud {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachine, ProviderError> {
        let kind = ResourceKind::VirtualMachine;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Get, name)?;
        inner
            .vms
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| not_found(kind, resource_group, name))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        mut vm: VirtualMachine,
    ) -> Result<VirtualMachine, ProviderError> {
        let kind = ResourceKind::VirtualMachine;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::CreateOrUpdate, name)?;

        vm.id = Some(self.resource_id(kind, resource_group, name).to_string());
        vm.name = Some(name.to_owned());
        vm.properties.get_or_insert_with(Default::default).provisioning_state =
            Some(SUCCEEDED.to_owned());
        inner.vms.insert(key(resource_group, name), vm.clone());
        Ok(vm)
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        let kind = ResourceKind::VirtualMachine;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Delete, name)?;
        inner
            .vms
            .remove(&key(resource_group, name))
            .map(|_| ())
            .ok_or_else(|| not_found(kind, resource_group, name))
    }
}

#[async_trait]
impl NetworkInterfacesClient for FakeCloud {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<NetworkInterface, ProviderError> {
        let kind = ResourceKind::NetworkInterface;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Get, name)?;
        inner
            .nics
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| not_found(kind, resource_group, name))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        mut nic: NetworkInterface,
    ) -> Result<NetworkInterface, ProviderError> {
        let kind = ResourceKind::NetworkInterface;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::CreateOrUpdate, name)?;

        let id = self.resource_id(kind, resource_group, name);
        nic.id = Some(id.to_string());
        nic.name = Some(name.to_owned());

        let props = nic.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some(SUCCEEDED.to_owned());
        for (i, config) in props.ip_configurations.iter_mut().enumerate() {
            let config_name =
                config.name.get_or_insert_with(|| format!("ipconfig{i}"));
            config.id = Some(
                id.child("ipConfigurations", config_name.as_str()).to_string(),
            );
            let config_props =
                config.properties.get_or_insert_with(Default::default);
            if config_props.private_ip_address.is_none() {
                config_props.private_ip_address =
                    Some(inner.next_address(PRIVATE_NETWORK).to_string());
            }
        }

        inner.nics.insert(key(resource_group, name), nic.clone());
        Ok(nic)
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        let kind = ResourceKind::NetworkInterface;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Delete, name)?;
        inner
            .nics
            .remove(&key(resource_group, name))
            .map(|_| ())
            .ok_or_else(|| not_found(kind, resource_group, name))
    }
}

#[async_trait]
impl PublicIpAddressesClient for FakeCloud {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<PublicIpAddress, ProviderError> {
        let kind = ResourceKind::PublicIpAddress;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Get, name)?;
        inner
            .public_ips
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| not_found(kind, resource_group, name))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        mut ip: PublicIpAddress,
    ) -> Result<PublicIpAddress, ProviderError> {
        let kind = ResourceKind::PublicIpAddress;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::CreateOrUpdate, name)?;

        ip.id = Some(self.resource_id(kind, resource_group, name).to_string());
        ip.name = Some(name.to_owned());
        let address = inner.next_address(PUBLIC_NETWORK);
        let props = ip.properties.get_or_insert_with(Default::default);
        props.provisioning_state = Some(SUCCEEDED.to_owned());
        if props.ip_address.is_none() {
            props.ip_address = Some(address.to_string());
        }

        inner.public_ips.insert(key(resource_group, name), ip.clone());
        Ok(ip)
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError> {
        let kind = ResourceKind::PublicIpAddress;
        let mut inner = self.inner.lock().await;
        inner.call(kind, Operation::Delete, name)?;
        inner
            .public_ips
            .remove(&key(resource_group, name))
            .map(|_| ())
            .ok_or_else(|| not_found(kind, resource_group, name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::StatusCode;
    use crate::network::{
        IpConfiguration, IpConfigurationProperties, NetworkInterfaceProperties,
    };

    #[tokio::test]
    async fn vm_lifecycle() {
        let cloud = FakeCloud::new("sub");

        let err = VirtualMachinesClient::get(&cloud, "rg", "vm").await.unwrap_err();
        assert!(err.is_not_found());

        let vm = VirtualMachinesClient::create_or_update(
            &cloud,
            "rg",
            "vm",
            VirtualMachine::default(),
        )
        .await
        .unwrap();
        assert_eq!(
            vm.id.as_deref(),
            Some("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm")
        );
        assert_eq!(vm.provisioning_state(), Some("Succeeded"));

        let fetched = VirtualMachinesClient::get(&cloud, "rg", "vm").await.unwrap();
        assert_eq!(fetched, vm);

        VirtualMachinesClient::delete(&cloud, "rg", "vm").await.unwrap();
        let err = VirtualMachinesClient::delete(&cloud, "rg", "vm")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let calls = cloud.calls().await;
        let vm_kind = ResourceKind::VirtualMachine;
        assert_eq!(calls.get(vm_kind, Operation::Get), 2);
        assert_eq!(calls.get(vm_kind, Operation::CreateOrUpdate), 1);
        assert_eq!(calls.get(vm_kind, Operation::Delete), 2);
        assert_eq!(
            calls.get(ResourceKind::NetworkInterface, Operation::Get),
            0
        );
    }

    #[tokio::test]
    async fn nics_get_addresses() {
        let cloud = FakeCloud::new("sub");
        let nic = NetworkInterface {
            properties: Some(NetworkInterfaceProperties {
                ip_configurations: vec![
                    IpConfiguration::default(),
                    IpConfiguration {
                        name: Some("fixed".to_owned()),
                        properties: Some(IpConfigurationProperties {
                            private_ip_address: Some("10.1.2.3".to_owned()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        let nic = NetworkInterfacesClient::create_or_update(&cloud, "rg", "nic", nic)
            .await
            .unwrap();

        let configs = nic.ip_configurations();
        assert_eq!(configs[0].name.as_deref(), Some("ipconfig0"));
        assert_eq!(
            configs[0].properties.as_ref().unwrap().private_ip_address.as_deref(),
            Some("10.0.0.1")
        );
        assert_eq!(
            configs[1].properties.as_ref().unwrap().private_ip_address.as_deref(),
            Some("10.1.2.3")
        );
        assert!(configs[1].id.as_deref().unwrap().ends_with("/ipConfigurations/fixed"));
    }

    #[test]
    fn addresses_stay_valid() {
        let mut inner = Inner::default();
        let addresses: Vec<_> =
            (0..300).map(|_| inner.next_address(PRIVATE_NETWORK)).collect();
        assert_eq!(addresses[0], Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(addresses[254], Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(addresses[255], Ipv4Addr::new(10, 0, 1, 0));
        assert_eq!(addresses[299], Ipv4Addr::new(10, 0, 1, 44));

        inner.next_host = HOST_MASK - 2;
        assert_eq!(
            inner.next_address(PUBLIC_NETWORK),
            Ipv4Addr::new(20, 255, 255, 254)
        );
        assert_eq!(
            inner.next_address(PUBLIC_NETWORK),
            Ipv4Addr::new(20, 0, 0, 1)
        );
    }

    #[tokio::test]
    async fn injected_failures() {
        let cloud = FakeCloud::new("sub");
        cloud
            .inject_failure(
                ResourceKind::PublicIpAddress,
                Operation::CreateOrUpdate,
                "ip",
                ProviderError::new(StatusCode::CONFLICT, "quota exceeded"),
            )
            .await;

        let err = PublicIpAddressesClient::create_or_update(
            &cloud,
            "rg",
            "ip",
            PublicIpAddress::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        cloud.clear_failures().await;
        let ip = PublicIpAddressesClient::create_or_update(
            &cloud,
            "rg",
            "ip",
            PublicIpAddress::default(),
        )
        .await
        .unwrap();
        assert!(ip.ip_address().is_some());
    }
}
