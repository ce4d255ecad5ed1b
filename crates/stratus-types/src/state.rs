// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observed VM state.

use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A resource's provider-reported lifecycle status.
///
/// States the provider reports that aren't listed here are preserved verbatim
/// in [`ProvisioningState::Other`].
#[derive(
    Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString,
)]
pub enum ProvisioningState {
    /// The implicit state of a VM that was observed before the provider
    /// assigned it an explicit state.
    #[default]
    Creating,
    Updating,
    Succeeded,
    Failed,
    Deleting,
    Deleted,
    Canceled,
    Migrating,
    #[strum(default)]
    Other(String),
}

impl Serialize for ProvisioningState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'d> Deserialize<'d> for ProvisioningState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

/// The kind of a VM address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum AddressKind {
    #[serde(rename = "InternalIP")]
    InternalIp,
    #[serde(rename = "ExternalIP")]
    ExternalIp,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct VmAddress {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    pub address: String,
}

impl VmAddress {
    pub fn internal(address: impl Into<String>) -> Self {
        Self { kind: AddressKind::InternalIp, address: address.into() }
    }

    pub fn external(address: impl Into<String>) -> Self {
        Self { kind: AddressKind::ExternalIp, address: address.into() }
    }
}

/// A point-in-time view of a VM assembled from the provider's VM, network
/// interface, and public IP resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservedVm {
    pub id: String,
    pub name: String,
    pub state: ProvisioningState,
    pub addresses: Vec<VmAddress>,
}
