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

//! # Migration
//!
//! Offer snapshot and restore interface for emulated devices.
//!
//! A device implements [`StateTransfer`] to turn its state into a byte vector and back.
//! [`MigrationManager`] wraps that vector with a header carrying the device's
//! [`DeviceStateDesc`] so a restore can refuse streams written by another device type or by an
//! unsupported state version.

pub mod error;

mod device_state;
mod snapshot;

pub use anyhow::Result;

pub use device_state::{DeviceStateDesc, StateTransfer, VersionCheck};
pub use error::MigrationError;
pub use snapshot::MigrationManager;
