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

pub mod config;
pub mod error;
pub mod otg;

pub use error::UsbError;

use byteorder::{ByteOrder, LittleEndian};

use config::USB_SETUP_PACKET_SIZE;

/// USB request used to transfer to USB device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct UsbDeviceRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl UsbDeviceRequest {
    /// Encode the request as the 8 bytes of a setup stage, multi-byte fields in little endian.
    pub fn to_setup_packet(&self) -> [u8; USB_SETUP_PACKET_SIZE] {
        let mut packet = [0_u8; USB_SETUP_PACKET_SIZE];
        packet[0] = self.request_type;
        packet[1] = self.request;
        LittleEndian::write_u16(&mut packet[2..4], self.value);
        LittleEndian::write_u16(&mut packet[4..6], self.index);
        LittleEndian::write_u16(&mut packet[6..8], self.length);
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::config::*;
    use super::*;

    #[test]
    fn test_setup_packet() {
        let req = UsbDeviceRequest {
            request_type: USB_DEVICE_IN_REQUEST,
            request: USB_REQUEST_GET_DESCRIPTOR,
            value: (USB_DT_DEVICE as u16) << 8,
            index: 0,
            length: 0x40,
        };
        assert_eq!(
            req.to_setup_packet(),
            [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00]
        );
    }
}
