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
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use arc_swap::ArcSwap;
use log::debug;

use crate::{AddressRange, AddressSpaceError, GuestAddress, Region};

/// A region placed at a fixed guest address.
#[derive(Clone)]
struct FlatRange {
    addr_range: AddressRange,
    owner: Region,
}

/// Address Space of memory.
pub struct AddressSpace {
    /// The name of AddressSpace.
    name: String,
    /// Sorted, non-overlapping regions. Readers never take a lock.
    flat_view: ArcSwap<Vec<FlatRange>>,
    /// Serializes topology updates.
    update_lock: Mutex<()>,
}

impl fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges: Vec<(String, AddressRange)> = self
            .flat_view
            .load()
            .iter()
            .map(|fr| (fr.owner.name.clone(), fr.addr_range))
            .collect();
        f.debug_struct("AddressSpace")
            .field("name", &self.name)
            .field("flat_view", &ranges)
            .finish()
    }
}

impl AddressSpace {
    /// Create a new, empty `AddressSpace`.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of this address space.
    pub fn new(name: &str) -> Arc<AddressSpace> {
        Arc::new(AddressSpace {
            name: String::from(name),
            flat_view: ArcSwap::from_pointee(Vec::new()),
            update_lock: Mutex::new(()),
        })
    }

    /// Get the name of this address space.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Place `region` at guest address `base`.
    ///
    /// # Errors
    ///
    /// Return Error if the region wraps around the address space or overlaps a region that is
    /// already mapped.
    pub fn add_region(&self, region: Region, base: GuestAddress) -> Result<()> {
        let addr_range = AddressRange::new(base, region.size());
        if addr_range.end_addr().is_none() {
            return Err(anyhow!(AddressSpaceError::Overflow(base.raw_value())));
        }

        let _guard = self.update_lock.lock().unwrap();
        let old_view = self.flat_view.load();
        if let Some(fr) = old_view.iter().find(|fr| fr.addr_range.overlaps(&addr_range)) {
            return Err(anyhow!(AddressSpaceError::RegionOverlap(
                base.raw_value(),
                base.raw_value() + region.size(),
                fr.owner.name.clone()
            )));
        }

        debug!(
            "{}: add region {} at 0x{:x}, size 0x{:x}",
            self.name,
            region.name,
            base.raw_value(),
            region.size()
        );
        let mut new_view: Vec<FlatRange> = old_view.iter().cloned().collect();
        new_view.push(FlatRange {
            addr_range,
            owner: region,
        });
        new_view.sort_by_key(|fr| fr.addr_range.base);
        self.flat_view.store(Arc::new(new_view));
        Ok(())
    }

    fn find_flat_range(&self, addr: GuestAddress, count: u64) -> Result<FlatRange> {
        let view = self.flat_view.load();
        let index = match view.binary_search_by_key(&addr, |fr| fr.addr_range.base) {
            Ok(index) => index,
            Err(0) => return Err(anyhow!(AddressSpaceError::RegionNotFound(addr.raw_value()))),
            Err(index) => index - 1,
        };
        let fr = &view[index];
        if !fr.addr_range.contains(addr, count) {
            return Err(anyhow!(AddressSpaceError::RegionNotFound(addr.raw_value())));
        }
        Ok(fr.clone())
    }

    /// Read data from specified guest address to `dst`.
    ///
    /// # Arguments
    ///
    /// * `dst` - Data buffer to write.
    /// * `addr` - Start address.
    /// * `count` - Size of data.
    ///
    /// # Errors
    ///
    /// Return Error if the range is not covered by a single region or the access fails.
    pub fn read(&self, dst: &mut dyn std::io::Write, addr: GuestAddress, count: u64) -> Result<()> {
        let fr = self.find_flat_range(addr, count)?;
        let base = fr.addr_range.base;
        fr.owner
            .read(dst, base, addr.offset_from(base), count)
            .with_context(|| {
                format!(
                    "{}: failed to read 0x{:x} bytes at 0x{:x}",
                    self.name,
                    count,
                    addr.raw_value()
                )
            })
    }

    /// Write data to specified guest address.
    ///
    /// # Arguments
    ///
    /// * `src` - Data buffer to read from.
    /// * `addr` - Start address.
    /// * `count` - Size of data.
    ///
    /// # Errors
    ///
    /// Return Error if the range is not covered by a single region or the access fails.
    pub fn write(&self, src: &mut dyn std::io::Read, addr: GuestAddress, count: u64) -> Result<()> {
        let fr = self.find_flat_range(addr, count)?;
        let base = fr.addr_range.base;
        fr.owner
            .write(src, base, addr.offset_from(base), count)
            .with_context(|| {
                format!(
                    "{}: failed to write 0x{:x} bytes at 0x{:x}",
                    self.name,
                    count,
                    addr.raw_value()
                )
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{HostMemMapping, RegionOps};

    fn io_region(size: u64, name: &str) -> Region {
        let ops = RegionOps {
            read: Arc::new(|data: &mut [u8], _: GuestAddress, offset: u64| -> bool {
                data.fill(offset as u8);
                true
            }),
            write: Arc::new(|_: &[u8], _: GuestAddress, _: u64| -> bool { false }),
        };
        Region::init_io_region(size, ops, name)
    }

    #[test]
    fn test_add_region_overlap() {
        let space = AddressSpace::new("sysmem");
        let ram = Arc::new(HostMemMapping::new(GuestAddress(0), 0x1000));
        space
            .add_region(Region::init_ram_region(ram, "ram"), GuestAddress(0))
            .unwrap();
        assert!(space
            .add_region(io_region(0x100, "dev0"), GuestAddress(0xf00))
            .is_err());
        assert!(space
            .add_region(io_region(0x100, "dev0"), GuestAddress(0x1000))
            .is_ok());
        assert!(space
            .add_region(io_region(0x100, "dev1"), GuestAddress(u64::MAX - 0x10))
            .is_err());
    }

    #[test]
    fn test_dispatch() {
        let space = AddressSpace::new("sysmem");
        let ram = Arc::new(HostMemMapping::new(GuestAddress(0x8000), 0x1000));
        space
            .add_region(Region::init_ram_region(ram, "ram"), GuestAddress(0x8000))
            .unwrap();
        space
            .add_region(io_region(0x100, "dev"), GuestAddress(0x1000))
            .unwrap();

        let mut out = Vec::new();
        space.read(&mut out, GuestAddress(0x1010), 2).unwrap();
        assert_eq!(out, vec![0x10, 0x10]);
        assert!(space
            .write(&mut [0_u8; 4].as_slice(), GuestAddress(0x1010), 4)
            .is_err());

        space
            .write(&mut [7_u8; 4].as_slice(), GuestAddress(0x8ffc), 4)
            .unwrap();
        let mut out = Vec::new();
        space.read(&mut out, GuestAddress(0x8ffc), 4).unwrap();
        assert_eq!(out, vec![7; 4]);

        // Hole, below first region and crossing a region end.
        assert!(space.read(&mut out, GuestAddress(0x2000), 4).is_err());
        assert!(space.read(&mut out, GuestAddress(0x10), 4).is_err());
        assert!(space.read(&mut out, GuestAddress(0x8ffe), 4).is_err());
    }
}
