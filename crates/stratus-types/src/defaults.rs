// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Defaulting for machine specs.
//!
//! Each routine here fills in one class of unset fields on a [`MachineSpec`].
//! All of them are idempotent: applying a routine to a spec it has already
//! been applied to (or to a spec whose fields were all set by the user) does
//! nothing. Fields the user did set are never changed.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::sshkey::{self, KeyGenError};
use crate::{
    CachingType, MachineSpec, NetworkInterface, VmIdentity,
    CONTRIBUTOR_ROLE_ID,
};

impl MachineSpec {
    /// Applies every defaulting routine, in the order a defaulting webhook
    /// would.
    pub fn set_defaults(
        &mut self,
        subscription_id: &str,
    ) -> Result<(), KeyGenError> {
        self.set_default_ssh_public_key()?;
        self.set_identity_defaults(subscription_id);
        self.set_data_disks_defaults();
        self.set_network_interfaces_defaults();
        Ok(())
    }

    /// Generates an SSH public key if the spec doesn't have one.
    pub fn set_default_ssh_public_key(&mut self) -> Result<(), KeyGenError> {
        if self.ssh_public_key.is_empty() {
            self.ssh_public_key = sshkey::generate_ssh_public_key()?;
        }
        Ok(())
    }

    /// Fills in the role assignment of a system-assigned identity. Each of
    /// the assignment's fields is defaulted independently; other identity
    /// kinds are left alone.
    pub fn set_identity_defaults(&mut self, subscription_id: &str) {
        let VmIdentity::SystemAssigned { role } = &mut self.identity else {
            return;
        };

        if role.name.is_empty() {
            role.name = Uuid::new_v4().to_string();
        }
        if role.scope.is_empty() {
            role.scope = format!("/subscriptions/{subscription_id}/");
        }
        if role.definition_id.is_empty() {
            role.definition_id = format!(
                "/subscriptions/{subscription_id}/providers/\
                 Microsoft.Authorization/roleDefinitions/{CONTRIBUTOR_ROLE_ID}"
            );
        }
    }

    /// Assigns a LUN to every data disk that lacks one and picks a caching
    /// mode for every disk that lacks one.
    ///
    /// Disks without a LUN get the lowest LUN not already claimed, in list
    /// order. Ultra disks don't support host caching, so they default to
    /// [`CachingType::None`]; everything else defaults to
    /// [`CachingType::ReadWrite`].
    pub fn set_data_disks_defaults(&mut self) {
        let mut used: BTreeSet<i32> =
            self.data_disks.iter().filter_map(|d| d.lun).collect();

        let mut next = 0;
        for disk in self.data_disks.iter_mut().filter(|d| d.lun.is_none()) {
            while used.contains(&next) {
                next += 1;
            }
            used.insert(next);
            disk.lun = Some(next);
        }

        for disk in self.data_disks.iter_mut() {
            if disk.caching_type.is_none() {
                disk.caching_type = Some(if disk.is_ultra_disk() {
                    CachingType::None
                } else {
                    CachingType::ReadWrite
                });
            }
        }
    }

    /// Moves the deprecated `subnet_name` and `accelerated_networking`
    /// fields into the `network_interfaces` list.
    ///
    /// If `network_interfaces` already has entries, the deprecated fields
    /// are left exactly as they are.
    pub fn set_network_interfaces_defaults(&mut self) {
        if !self.network_interfaces.is_empty() || self.subnet_name.is_empty() {
            return;
        }

        self.network_interfaces = vec![NetworkInterface {
            subnet_name: std::mem::take(&mut self.subnet_name),
            private_ip_configs: 1,
            accelerated_networking: self.accelerated_networking.take(),
        }];
    }
}
