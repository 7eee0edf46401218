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

use std::fmt;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::{AddressRange, AddressSpaceError, GuestAddress};

/// Host memory backing one guest RAM region.
pub struct HostMemMapping {
    /// Address range of the guest memory backed by this mapping.
    address_range: AddressRange,
    /// Zero-initialised host buffer.
    mem: Mutex<Vec<u8>>,
}

impl fmt::Debug for HostMemMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMemMapping")
            .field("address_range", &self.address_range)
            .finish()
    }
}

impl HostMemMapping {
    /// Allocate `size` bytes of zeroed host memory for guest range starting at `guest_addr`.
    pub fn new(guest_addr: GuestAddress, size: u64) -> HostMemMapping {
        HostMemMapping {
            address_range: AddressRange::new(guest_addr, size),
            mem: Mutex::new(vec![0_u8; size as usize]),
        }
    }

    /// Size of the mapping in bytes.
    pub fn size(&self) -> u64 {
        self.address_range.size
    }

    fn check_offset(&self, offset: u64, count: u64) -> Result<(usize, usize)> {
        match offset.checked_add(count) {
            Some(end) if end <= self.size() => Ok((offset as usize, end as usize)),
            _ => Err(anyhow!(AddressSpaceError::InvalidOffset(
                offset,
                count,
                self.size()
            ))),
        }
    }

    /// Copy `count` bytes starting at `offset` into `dst`.
    pub fn read(&self, dst: &mut dyn std::io::Write, offset: u64, count: u64) -> Result<()> {
        let (start, end) = self.check_offset(offset, count)?;
        let mem = self.mem.lock().unwrap();
        dst.write_all(&mem[start..end])?;
        Ok(())
    }

    /// Fill `count` bytes starting at `offset` from `src`.
    pub fn write(&self, src: &mut dyn std::io::Read, offset: u64, count: u64) -> Result<()> {
        let (start, end) = self.check_offset(offset, count)?;
        let mut mem = self.mem.lock().unwrap();
        src.read_exact(&mut mem[start..end])?;
        Ok(())
    }
}
