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

/// USB 2.0 section 9.3 USB Device Requests. Setup Data.
pub const USB_DIRECTION_HOST_TO_DEVICE: u8 = 0 << 7;
pub const USB_DIRECTION_DEVICE_TO_HOST: u8 = 0x80;
pub const USB_TYPE_STANDARD: u8 = 0x00 << 5;
pub const USB_RECIPIENT_DEVICE: u8 = 0;
pub const USB_RECIPIENT_INTERFACE: u8 = 1;

/// USB device request combination
pub const USB_DEVICE_IN_REQUEST: u8 =
    USB_DIRECTION_DEVICE_TO_HOST | USB_TYPE_STANDARD | USB_RECIPIENT_DEVICE;
pub const USB_DEVICE_OUT_REQUEST: u8 =
    USB_DIRECTION_HOST_TO_DEVICE | USB_TYPE_STANDARD | USB_RECIPIENT_DEVICE;
pub const USB_INTERFACE_OUT_REQUEST: u8 =
    USB_DIRECTION_HOST_TO_DEVICE | USB_TYPE_STANDARD | USB_RECIPIENT_INTERFACE;

/// USB Standard Request Code. 9.4 Standard Device Requests
pub const USB_REQUEST_GET_DESCRIPTOR: u8 = 6;
pub const USB_REQUEST_SET_CONFIGURATION: u8 = 9;
pub const USB_REQUEST_SET_INTERFACE: u8 = 11;

/// USB Descriptor Type
pub const USB_DT_DEVICE: u8 = 1;

/// Size of the setup stage data.
pub const USB_SETUP_PACKET_SIZE: usize = 8;
