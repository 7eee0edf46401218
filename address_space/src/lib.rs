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

//! Manages the guest physical address space.
//!
//! An [`AddressSpace`] is a flat list of non-overlapping [`Region`]s. A RAM region is backed
//! by a [`HostMemMapping`]; an I/O region forwards every access to the [`RegionOps`] callbacks
//! registered by the owning device. Guest MMIO dispatch and device DMA both go through
//! [`AddressSpace::read`] and [`AddressSpace::write`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use address_space::{AddressSpace, GuestAddress, HostMemMapping, Region};
//!
//! let space = AddressSpace::new("sysmem");
//! let ram = Arc::new(HostMemMapping::new(GuestAddress(0), 0x1000));
//! space
//!     .add_region(Region::init_ram_region(ram, "ram"), GuestAddress(0))
//!     .unwrap();
//!
//! space
//!     .write(&mut [0xaa_u8; 4].as_slice(), GuestAddress(0x10), 4)
//!     .unwrap();
//! let mut data = Vec::new();
//! space.read(&mut data, GuestAddress(0x10), 4).unwrap();
//! assert_eq!(data, vec![0xaa; 4]);
//! ```

mod address;
mod address_space;
mod host_mmap;
mod region;

pub mod error;

pub use crate::address_space::AddressSpace;
pub use address::{AddressRange, GuestAddress};
pub use error::AddressSpaceError;
pub use host_mmap::HostMemMapping;
pub use region::{Region, RegionOps, RegionType};
