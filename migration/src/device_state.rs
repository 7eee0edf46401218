// Copyright (c) 2024 Huawei Technologies Co.,Ltd. All rights reserved.
//
// StratoVirt is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Version check result enum.
#[derive(PartialEq, Eq, Debug)]
pub enum VersionCheck {
    /// Version is completely same.
    Same,
    /// Version is not same but compat.
    Compat,
    /// Version is not compatible.
    Mismatch,
}

/// Trait to acquire device state bytes from a device and recover the device's state from
/// those bytes.
///
/// # Notes
/// The byte layout is owned by the device. The framing written around it by
/// [`MigrationManager`](crate::MigrationManager) carries the descriptor returned by
/// [`StateTransfer::state_desc`], whose `current_version` is handed back to
/// [`StateTransfer::set_state_mut`] on restore.
pub trait StateTransfer {
    /// Get the device's state as bytes vector.
    fn get_state_vec(&self) -> Result<Vec<u8>>;

    /// Set the device's state from a bytes slice written by state version `version`.
    ///
    /// Implementations must leave the device untouched when they return an error.
    fn set_state_mut(&mut self, state: &[u8], version: u32) -> Result<()>;

    /// Describe the state layout this device writes.
    fn state_desc(&self) -> DeviceStateDesc;
}

/// The structure to describe device state with version message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceStateDesc {
    /// Device type identify.
    pub name: String,
    /// Device current migration version.
    pub current_version: u32,
    /// The minimum required device migration version.
    pub compat_version: u32,
}

impl DeviceStateDesc {
    pub fn new(name: &str, current_version: u32, compat_version: u32) -> Self {
        DeviceStateDesc {
            name: name.to_string(),
            current_version,
            compat_version,
        }
    }

    /// Check device state version descriptor version message.
    /// If version is same, return enum `Same`.
    /// If version is not same but fit, return enum `Compat`.
    /// if version is not fit, return enum `Mismatch`.
    ///
    /// # Arguments
    ///
    /// * `desc`: device state descriptor read from a snapshot.
    pub fn check_version(&self, desc: &DeviceStateDesc) -> VersionCheck {
        match self.current_version.cmp(&desc.current_version) {
            Ordering::Equal => VersionCheck::Same,
            Ordering::Greater if desc.current_version >= self.compat_version => {
                VersionCheck::Compat
            }
            _ => VersionCheck::Mismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_version() {
        let desc = DeviceStateDesc::new("dev", 3, 2);
        assert_eq!(
            desc.check_version(&DeviceStateDesc::new("dev", 3, 2)),
            VersionCheck::Same
        );
        assert_eq!(
            desc.check_version(&DeviceStateDesc::new("dev", 2, 1)),
            VersionCheck::Compat
        );
        assert_eq!(
            desc.check_version(&DeviceStateDesc::new("dev", 1, 1)),
            VersionCheck::Mismatch
        );
        assert_eq!(
            desc.check_version(&DeviceStateDesc::new("dev", 4, 1)),
            VersionCheck::Mismatch
        );
    }

    #[test]
    fn test_desc_json() {
        let desc = DeviceStateDesc::new("s5pc1xx.usb.otg", 1, 1);
        let json = serde_json::to_string(&desc).unwrap();
        let parsed: DeviceStateDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, desc);
    }
}
