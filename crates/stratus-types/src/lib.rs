// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fundamental types shared by the Stratus crates.
//!
//! This crate defines the declarative machine description ([`MachineSpec`]),
//! the per-VM input consumed by the reconciler ([`VmSpec`]), and the observed
//! state the reconciler reports back ([`ObservedVm`]). It also hosts the
//! defaulting logic that turns a partially specified [`MachineSpec`] into a
//! complete one; see the [`defaults`] module.
//!
//! Nothing in here talks to a cloud provider. The provider's wire model lives
//! in `stratus-cloud`, and the code that maps between the two lives in the
//! reconciler.

pub mod defaults;
pub mod disk;
pub mod image;
pub mod machine;
pub mod sshkey;
pub mod state;
pub mod tags;

pub use disk::{CachingType, DataDisk, ManagedDiskParameters, OsDisk};
pub use image::{Image, MarketplaceImage, SharedGalleryImage};
pub use machine::{
    IpTag, MachineRole, MachineSpec, NetworkInterface, RoleAssignment,
    SpotVmOptions, UserAssignedIdentity, VmIdentity, VmSpec,
};
pub use state::{AddressKind, ObservedVm, ProvisioningState, VmAddress};
pub use tags::Tags;

/// The ID of the provider's built-in "Contributor" role definition.
///
/// System-assigned identities that don't name a role definition are granted
/// this one over their subscription.
pub const CONTRIBUTOR_ROLE_ID: &str = "b24988ac-6180-42a0-ab88-20f7382dd24c";

/// The storage account type that identifies an ultra disk.
pub const ULTRA_SSD_STORAGE_ACCOUNT_TYPE: &str = "UltraSSD_LRS";

/// The administrator account created on every Linux VM.
pub const ADMIN_USERNAME: &str = "stratus";
