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
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::{AddressSpaceError, GuestAddress, HostMemMapping};

/// Types of Region.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegionType {
    /// Ram type.
    Ram,
    /// IO type.
    IO,
}

type ReadFn = dyn Fn(&mut [u8], GuestAddress, u64) -> bool + Send + Sync;
type WriteFn = dyn Fn(&[u8], GuestAddress, u64) -> bool + Send + Sync;

/// Provide Some operations of `Region`, mainly used by Vm's devices.
#[derive(Clone)]
pub struct RegionOps {
    /// Read data from Region to argument `data`,
    /// return `true` if read successfully, or return `false`.
    ///
    /// # Arguments
    ///
    /// * `data` - A u8-type array.
    /// * `base` - Base address.
    /// * `offset` - Offset from base address.
    pub read: Arc<ReadFn>,
    /// Write `data` to memory,
    /// return `true` if write successfully, or return `false`.
    ///
    /// # Arguments
    ///
    /// * `data` - A u8-type array.
    /// * `base` - Base address.
    /// * `offset` - Offset from base address.
    pub write: Arc<WriteFn>,
}

/// Represents a memory region, used by mem-mapped IO or Ram.
#[derive(Clone)]
pub struct Region {
    /// The name of Region
    pub name: String,
    /// Type of Region, won't be changed once initialized.
    region_type: RegionType,
    /// Size of Region.
    size: u64,
    /// If not Ram Region type, `mem_mapping` is None.
    mem_mapping: Option<Arc<HostMemMapping>>,
    /// `ops` provides read/write function for IO Region.
    ops: Option<RegionOps>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("region_type", &self.region_type)
            .field("size", &self.size)
            .field("mem_mapping", &self.mem_mapping)
            .finish()
    }
}

impl Region {
    fn init_region_internal(
        name: &str,
        size: u64,
        region_type: RegionType,
        mem_mapping: Option<Arc<HostMemMapping>>,
        ops: Option<RegionOps>,
    ) -> Region {
        Region {
            name: String::from(name),
            region_type,
            size,
            mem_mapping,
            ops,
        }
    }

    /// Initialize Ram-type region.
    ///
    /// # Arguments
    ///
    /// * `mem_mapping` - Mapped memory.
    /// * `name` - Name of Region.
    pub fn init_ram_region(mem_mapping: Arc<HostMemMapping>, name: &str) -> Region {
        Region::init_region_internal(
            name,
            mem_mapping.size(),
            RegionType::Ram,
            Some(mem_mapping),
            None,
        )
    }

    /// Initialize IO-type region.
    ///
    /// # Arguments
    ///
    /// * `size` - Size of IO region.
    /// * `ops` - Operation of Region.
    /// * `name` - Name of Region.
    pub fn init_io_region(size: u64, ops: RegionOps, name: &str) -> Region {
        Region::init_region_internal(name, size, RegionType::IO, None, Some(ops))
    }

    /// Get the size of this region.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn check_valid_offset(&self, offset: u64, count: u64) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(anyhow!(AddressSpaceError::InvalidOffset(
                offset, count, self.size
            ))),
        }
    }

    /// Read memory segment to `dst`.
    ///
    /// # Arguments
    ///
    /// * `dst` - Destination the data would be written to.
    /// * `base` - Base address of this region in its address space.
    /// * `offset` - Offset from base address.
    /// * `count` - Size of data.
    ///
    /// # Errors
    ///
    /// Return Error if
    /// * the offset and count exceed the region.
    /// * the device refuses the io access.
    pub fn read(
        &self,
        dst: &mut dyn std::io::Write,
        base: GuestAddress,
        offset: u64,
        count: u64,
    ) -> Result<()> {
        self.check_valid_offset(offset, count)?;

        match self.region_type {
            RegionType::Ram => {
                let mapping = self
                    .mem_mapping
                    .as_ref()
                    .ok_or_else(|| anyhow!(AddressSpaceError::RegionType(self.region_type)))?;
                mapping
                    .read(dst, offset, count)
                    .with_context(|| "Failed to read content of Ram to mutable buffer")?;
            }
            RegionType::IO => {
                let ops = self
                    .ops
                    .as_ref()
                    .ok_or_else(|| anyhow!(AddressSpaceError::RegionType(self.region_type)))?;
                let read_ops = ops.read.as_ref();
                let mut slice = vec![0_u8; count as usize];
                if !read_ops(&mut slice, base, offset) {
                    return Err(anyhow!(AddressSpaceError::IoAccess(
                        base.raw_value(),
                        offset,
                        count
                    )));
                }
                dst.write_all(&slice).with_context(|| {
                    "Failed to write slice provided by device to mutable buffer"
                })?;
            }
        }
        Ok(())
    }

    /// Write data segment from `src` to memory.
    ///
    /// # Arguments
    ///
    /// * `src` - Source data.
    /// * `base` - Base address of this region in its address space.
    /// * `offset` - Offset from base address.
    /// * `count` - Size of data.
    ///
    /// # Errors
    ///
    /// Return Error if
    /// * the offset and count exceed the region.
    /// * the device refuses the io access.
    pub fn write(
        &self,
        src: &mut dyn std::io::Read,
        base: GuestAddress,
        offset: u64,
        count: u64,
    ) -> Result<()> {
        self.check_valid_offset(offset, count)?;

        match self.region_type {
            RegionType::Ram => {
                let mapping = self
                    .mem_mapping
                    .as_ref()
                    .ok_or_else(|| anyhow!(AddressSpaceError::RegionType(self.region_type)))?;
                mapping
                    .write(src, offset, count)
                    .with_context(|| "Failed to write buffer to Ram")?;
            }
            RegionType::IO => {
                let ops = self
                    .ops
                    .as_ref()
                    .ok_or_else(|| anyhow!(AddressSpaceError::RegionType(self.region_type)))?;
                let mut slice = vec![0_u8; count as usize];
                src.read_exact(&mut slice).with_context(|| {
                    "Failed to write buffer to slice, which will be provided for device"
                })?;
                let write_ops = ops.write.as_ref();
                if !write_ops(&slice, base, offset) {
                    return Err(anyhow!(AddressSpaceError::IoAccess(
                        base.raw_value(),
                        offset,
                        count
                    )));
                }
            }
        }
        Ok(())
    }
}
