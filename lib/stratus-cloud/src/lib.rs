// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cloud provider's resource model and the client capabilities the
//! reconciler consumes.
//!
//! Each resource kind (virtual machines, network interfaces, public IP
//! addresses) is reached through a narrow client trait offering `get`,
//! `create_or_update`, and `delete`. Transport concerns (HTTP, auth, transport
//! level retries) belong to implementations of these traits and are invisible
//! here. [`fake::FakeCloud`] is an in-memory implementation of all three.

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

pub mod compute;
pub mod fake;
pub mod network;
mod resource_id;

pub use resource_id::{name_from_id, ResourceId, ResourceIdError};

use compute::VirtualMachine;
use network::{NetworkInterface, PublicIpAddress};

/// An error returned by the provider's API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}: StatusCode={}", .status.as_u16())]
pub struct ProviderError {
    pub status: StatusCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Returns `true` if the provider reported that the resource does not
    /// exist.
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait VirtualMachinesClient: Send + Sync {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachine, ProviderError>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        vm: VirtualMachine,
    ) -> Result<VirtualMachine, ProviderError>;

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError>;
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait NetworkInterfacesClient: Send + Sync {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<NetworkInterface, ProviderError>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        nic: NetworkInterface,
    ) -> Result<NetworkInterface, ProviderError>;

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError>;
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PublicIpAddressesClient: Send + Sync {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<PublicIpAddress, ProviderError>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        ip: PublicIpAddress,
    ) -> Result<PublicIpAddress, ProviderError>;

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = ProviderError::not_found("VirtualMachine my-vm was not found");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "VirtualMachine my-vm was not found: StatusCode=404"
        );

        let err = ProviderError::new(StatusCode::CONFLICT, "busy");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "busy: StatusCode=409");
    }
}
