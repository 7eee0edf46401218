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

use byteorder::{ByteOrder, LittleEndian};
use log::error;

// MMIO data helpers for register emulation.

/// Store `value` into an MMIO data buffer of 1, 2 or 4 bytes in little endian.
/// Wider registers are truncated to the access width.
///
/// # Examples
///
/// ```rust
/// use util::num_ops::write_data_u32;
///
/// let mut data = [0_u8; 2];
/// assert!(write_data_u32(&mut data, 0x1234_5678));
/// assert_eq!(data, [0x78, 0x56]);
/// ```
pub fn write_data_u32(data: &mut [u8], value: u32) -> bool {
    match data.len() {
        1 => data[0] = value as u8,
        2 => LittleEndian::write_u16(data, value as u16),
        4 => LittleEndian::write_u32(data, value),
        _ => {
            error!(
                "Invalid data length: value {:#x}, data len {}",
                value,
                data.len()
            );
            return false;
        }
    };
    true
}

/// Load a value from an MMIO data buffer of 1, 2 or 4 bytes in little endian.
///
/// # Examples
///
/// ```rust
/// use util::num_ops::read_data_u32;
///
/// assert_eq!(read_data_u32(&[0x11, 0x22, 0x33, 0x44]), Some(0x4433_2211));
/// assert_eq!(read_data_u32(&[0x11, 0x22, 0x33]), None);
/// ```
pub fn read_data_u32(data: &[u8]) -> Option<u32> {
    match data.len() {
        1 => Some(u32::from(data[0])),
        2 => Some(u32::from(LittleEndian::read_u16(data))),
        4 => Some(LittleEndian::read_u32(data)),
        _ => {
            error!("Invalid data length: data len {}", data.len());
            None
        }
    }
}
