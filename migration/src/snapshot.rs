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

use std::io::{Read, Write};

use anyhow::{bail, Context};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};

use crate::device_state::{DeviceStateDesc, StateTransfer, VersionCheck};
use crate::error::MigrationError;
use crate::Result;

/// Magic number for device snapshot. Those bytes represent "OTGVIRT".
const MAGIC_NUMBER: [u8; 16] = [
    0x4f, 0x54, 0x47, 0x56, 0x49, 0x52, 0x54, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0,
];
/// Upper bound of the serialized descriptor accepted on restore.
const MAX_DESC_LEN: u32 = 4096;
/// Upper bound of the device state accepted on restore.
const MAX_STATE_LEN: u32 = 1 << 20;

/// Device snapshot framing.
///
/// # Layout
///
/// ```text
/// +----------------+---------------+-------------------+----------------+--------------+
/// | magic (16 B)   | desc len (BE) | desc (JSON)       | state len (BE) | state bytes  |
/// +----------------+---------------+-------------------+----------------+--------------+
/// ```
pub struct MigrationManager;

impl MigrationManager {
    /// Write the snapshot of `dev` into `writer`.
    pub fn save_device_state(dev: &dyn StateTransfer, writer: &mut dyn Write) -> Result<()> {
        let desc = dev.state_desc();
        let state = dev.get_state_vec()?;
        let desc_bytes = serde_json::to_vec(&desc).map_err(MigrationError::from)?;

        writer
            .write_all(&MAGIC_NUMBER)
            .map_err(MigrationError::from)?;
        writer
            .write_u32::<BigEndian>(desc_bytes.len() as u32)
            .map_err(MigrationError::from)?;
        writer.write_all(&desc_bytes).map_err(MigrationError::from)?;
        writer
            .write_u32::<BigEndian>(state.len() as u32)
            .map_err(MigrationError::from)?;
        writer.write_all(&state).map_err(MigrationError::from)?;

        info!(
            "Saved state of {} version {}, {} bytes",
            desc.name,
            desc.current_version,
            state.len()
        );
        Ok(())
    }

    /// Restore `dev` from a snapshot read out of `reader`.
    ///
    /// The device is left unchanged if the stream is malformed, belongs to another device type
    /// or carries a state version the device can't load.
    pub fn restore_device_state(dev: &mut dyn StateTransfer, reader: &mut dyn Read) -> Result<()> {
        let desc = Self::load_desc(reader)?;
        let local = dev.state_desc();
        if desc.name != local.name {
            return Err(anyhow::anyhow!(MigrationError::HeaderItemNotFit(format!(
                "Device name {}",
                desc.name
            ))));
        }
        if local.check_version(&desc) == VersionCheck::Mismatch {
            return Err(anyhow::anyhow!(MigrationError::VersionNotFit(
                desc.current_version,
                local.current_version
            )));
        }

        let state_len = reader
            .read_u32::<BigEndian>()
            .map_err(MigrationError::from)?;
        if state_len > MAX_STATE_LEN {
            bail!("Device state length {} is too large", state_len);
        }
        let mut state = vec![0_u8; state_len as usize];
        reader
            .read_exact(&mut state)
            .map_err(MigrationError::from)
            .with_context(|| format!("Failed to read state of {}", desc.name))?;

        dev.set_state_mut(&state, desc.current_version)
            .with_context(|| format!("Failed to restore state of {}", desc.name))?;
        debug!("Restored state of {} version {}", desc.name, desc.current_version);
        Ok(())
    }

    fn load_desc(reader: &mut dyn Read) -> Result<DeviceStateDesc> {
        let mut magic = [0_u8; 16];
        reader
            .read_exact(&mut magic)
            .map_err(MigrationError::from)?;
        if magic != MAGIC_NUMBER {
            return Err(anyhow::anyhow!(MigrationError::HeaderItemNotFit(
                "Magic_number".to_string()
            )));
        }

        let desc_len = reader
            .read_u32::<BigEndian>()
            .map_err(MigrationError::from)?;
        if desc_len > MAX_DESC_LEN {
            bail!("Device state descriptor length {} is too large", desc_len);
        }
        let mut desc_bytes = vec![0_u8; desc_len as usize];
        reader
            .read_exact(&mut desc_bytes)
            .map_err(MigrationError::from)?;
        let desc: DeviceStateDesc =
            serde_json::from_slice(&desc_bytes).map_err(MigrationError::from)?;
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        version: u32,
    }

    impl StateTransfer for Counter {
        fn get_state_vec(&self) -> Result<Vec<u8>> {
            Ok(self.value.to_be_bytes().to_vec())
        }

        fn set_state_mut(&mut self, state: &[u8], _version: u32) -> Result<()> {
            if state.len() != 4 {
                return Err(anyhow::anyhow!(MigrationError::FromBytesError("Counter")));
            }
            self.value = u32::from_be_bytes([state[0], state[1], state[2], state[3]]);
            Ok(())
        }

        fn state_desc(&self) -> DeviceStateDesc {
            DeviceStateDesc::new("counter", self.version, 1)
        }
    }

    fn counter(value: u32) -> Counter {
        Counter { value, version: 1 }
    }

    #[test]
    fn test_save_and_restore() {
        let mut stream = Vec::new();
        MigrationManager::save_device_state(&counter(0xdead_beef), &mut stream).unwrap();
        assert_eq!(&stream[0..7], b"OTGVIRT");

        let mut dev = counter(0);
        MigrationManager::restore_device_state(&mut dev, &mut Cursor::new(stream)).unwrap();
        assert_eq!(dev.value, 0xdead_beef);
    }

    #[test]
    fn test_restore_bad_magic() {
        let mut stream = Vec::new();
        MigrationManager::save_device_state(&counter(7), &mut stream).unwrap();
        stream[0] = b'X';

        let mut dev = counter(3);
        assert!(
            MigrationManager::restore_device_state(&mut dev, &mut Cursor::new(stream)).is_err()
        );
        assert_eq!(dev.value, 3);
    }

    #[test]
    fn test_restore_version_mismatch() {
        let mut stream = Vec::new();
        let newer = Counter {
            value: 7,
            version: 2,
        };
        MigrationManager::save_device_state(&newer, &mut stream).unwrap();

        let mut dev = counter(3);
        let err = MigrationManager::restore_device_state(&mut dev, &mut Cursor::new(stream))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MigrationError>(),
            Some(MigrationError::VersionNotFit(2, 1))
        ));
        assert_eq!(dev.value, 3);
    }

    #[test]
    fn test_restore_truncated() {
        let mut stream = Vec::new();
        MigrationManager::save_device_state(&counter(7), &mut stream).unwrap();
        stream.truncate(stream.len() - 2);

        let mut dev = counter(3);
        assert!(
            MigrationManager::restore_device_state(&mut dev, &mut Cursor::new(stream)).is_err()
        );
        assert_eq!(dev.value, 3);
    }
}
