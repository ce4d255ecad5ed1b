// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversions from the provider's resource model into the types the rest of
//! the system reasons about.

use serde_derive::Serialize;

use stratus_cloud::compute::{ImageReference, VirtualMachine};
use stratus_cloud::network;
use stratus_types::{
    Image, IpTag, MarketplaceImage, ObservedVm, ProvisioningState,
};

/// A summary of one provider VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VmInstance {
    pub id: String,
    pub name: String,
    pub state: ProvisioningState,
    pub image: Option<Image>,
    pub availability_zone: Option<String>,
}

/// Returns the VM's provisioning state. A VM the provider hasn't assigned a
/// state to yet is still being created.
pub fn provisioning_state(vm: &VirtualMachine) -> ProvisioningState {
    vm.provisioning_state()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Converts a provider VM into an [`ObservedVm`] without any addresses;
/// those come from the VM's network interfaces.
pub fn observed_vm(vm: &VirtualMachine) -> ObservedVm {
    ObservedVm {
        id: vm.id.clone().unwrap_or_default(),
        name: vm.name.clone().unwrap_or_default(),
        state: provisioning_state(vm),
        addresses: Vec::new(),
    }
}

/// Converts a provider image reference. References carrying an ID are
/// returned as-is; anything else is a marketplace image, which is a
/// third-party image when the VM has a purchase plan.
pub fn image_from_reference(
    reference: &ImageReference,
    third_party: bool,
) -> Image {
    if let Some(id) = &reference.id {
        return Image::Id(id.clone());
    }

    Image::Marketplace(MarketplaceImage {
        publisher: reference.publisher.clone().unwrap_or_default(),
        offer: reference.offer.clone().unwrap_or_default(),
        sku: reference.sku.clone().unwrap_or_default(),
        version: reference.version.clone().unwrap_or_default(),
        third_party_image: third_party,
    })
}

/// A VM is pinned to at most one zone.
pub fn availability_zone(zones: &[String]) -> Option<String> {
    zones.first().cloned()
}

pub fn ip_tags(tags: &[IpTag]) -> Vec<network::IpTag> {
    tags.iter()
        .map(|t| network::IpTag {
            ip_tag_type: Some(t.ip_tag_type.clone()),
            tag: Some(t.tag.clone()),
        })
        .collect()
}

pub fn vm_instance(vm: &VirtualMachine) -> VmInstance {
    let properties = vm.properties.as_ref();
    let name = properties
        .and_then(|p| p.os_profile.as_ref())
        .and_then(|os| os.computer_name.clone())
        .or_else(|| vm.name.clone())
        .unwrap_or_default();
    let image = properties
        .and_then(|p| p.storage_profile.as_ref())
        .and_then(|s| s.image_reference.as_ref())
        .map(|r| image_from_reference(r, vm.plan.is_some()));

    VmInstance {
        id: vm.id.clone().unwrap_or_default(),
        name,
        state: provisioning_state(vm),
        image,
        availability_zone: availability_zone(&vm.zones),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use stratus_cloud::compute::{
        OsProfile, Plan, StorageProfile, VirtualMachineProperties,
    };

    #[test]
    fn state_defaults_to_creating() {
        let vm = VirtualMachine {
            properties: Some(VirtualMachineProperties::default()),
            ..Default::default()
        };
        assert_eq!(provisioning_state(&vm), ProvisioningState::Creating);
        assert_eq!(
            provisioning_state(&VirtualMachine::default()),
            ProvisioningState::Creating
        );

        let vm = VirtualMachine {
            properties: Some(VirtualMachineProperties {
                provisioning_state: Some("Deleting".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(provisioning_state(&vm), ProvisioningState::Deleting);
    }

    #[test]
    fn images() {
        let reference = ImageReference {
            publisher: Some("my-publisher".to_owned()),
            offer: Some("my-offer".to_owned()),
            sku: Some("my-sku".to_owned()),
            version: Some("1.0.0".to_owned()),
            id: None,
        };
        assert_eq!(
            image_from_reference(&reference, true),
            Image::Marketplace(MarketplaceImage {
                publisher: "my-publisher".to_owned(),
                offer: "my-offer".to_owned(),
                sku: "my-sku".to_owned(),
                version: "1.0.0".to_owned(),
                third_party_image: true,
            })
        );

        let reference = ImageReference {
            id: Some("/my/image".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            image_from_reference(&reference, false),
            Image::Id("/my/image".to_owned())
        );
    }

    #[test]
    fn instance_summary() {
        let vm = VirtualMachine {
            id: Some("my-id".to_owned()),
            name: Some("my-vm".to_owned()),
            zones: vec!["2".to_owned(), "3".to_owned()],
            plan: Some(Plan::default()),
            properties: Some(VirtualMachineProperties {
                os_profile: Some(OsProfile {
                    computer_name: Some("my-computer".to_owned()),
                    ..Default::default()
                }),
                storage_profile: Some(StorageProfile {
                    image_reference: Some(ImageReference {
                        publisher: Some("p".to_owned()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                provisioning_state: Some("Succeeded".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let instance = vm_instance(&vm);
        assert_eq!(instance.id, "my-id");
        assert_eq!(instance.name, "my-computer");
        assert_eq!(instance.state, ProvisioningState::Succeeded);
        assert_eq!(instance.availability_zone.as_deref(), Some("2"));
        assert!(matches!(
            instance.image,
            Some(Image::Marketplace(MarketplaceImage {
                third_party_image: true,
                ..
            }))
        ));

        let instance = vm_instance(&VirtualMachine {
            name: Some("bare".to_owned()),
            ..Default::default()
        });
        assert_eq!(instance.name, "bare");
        assert_eq!(instance.image, None);
        assert_eq!(instance.availability_zone, None);
    }
}
