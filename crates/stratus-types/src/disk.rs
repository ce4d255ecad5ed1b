// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk descriptions.

use serde::{Deserialize, Serialize};

use crate::ULTRA_SSD_STORAGE_ACCOUNT_TYPE;

/// Host caching mode for a disk.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
pub enum CachingType {
    None,
    ReadOnly,
    ReadWrite,
}

/// Parameters for a provider-managed disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManagedDiskParameters {
    pub storage_account_type: String,
}

impl ManagedDiskParameters {
    pub fn is_ultra_disk(&self) -> bool {
        self.storage_account_type == ULTRA_SSD_STORAGE_ACCOUNT_TYPE
    }
}

/// The VM's operating system disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OsDisk {
    #[serde(default)]
    pub os_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_type: Option<CachingType>,
}

/// An additional, initially empty, disk attached to the VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataDisk {
    /// Appended to the VM name (`<vm>_<suffix>`) to name the disk.
    pub name_suffix: String,

    pub disk_size_gb: i32,

    /// The disk's logical unit number. Filled in by
    /// [`MachineSpec::set_data_disks_defaults`](crate::MachineSpec::set_data_disks_defaults)
    /// when unset; unique across a VM's data disks once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching_type: Option<CachingType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

impl DataDisk {
    pub fn is_ultra_disk(&self) -> bool {
        self.managed_disk.as_ref().is_some_and(|md| md.is_ultra_disk())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn caching_type_strings() {
        for (s, ty) in [
            ("None", CachingType::None),
            ("ReadOnly", CachingType::ReadOnly),
            ("ReadWrite", CachingType::ReadWrite),
        ] {
            assert_eq!(CachingType::from_str(s).unwrap(), ty);
            assert_eq!(ty.to_string(), s);
        }

        assert!(CachingType::from_str("WriteBack").is_err());
    }

    #[test]
    fn ultra_disk_detection() {
        let mut disk = DataDisk {
            name_suffix: "etcd".to_owned(),
            disk_size_gb: 256,
            ..Default::default()
        };
        assert!(!disk.is_ultra_disk());

        disk.managed_disk = Some(ManagedDiskParameters {
            storage_account_type: "Premium_LRS".to_owned(),
        });
        assert!(!disk.is_ultra_disk());

        disk.managed_disk = Some(ManagedDiskParameters {
            storage_account_type: ULTRA_SSD_STORAGE_ACCOUNT_TYPE.to_owned(),
        });
        assert!(disk.is_ultra_disk());
    }
}
