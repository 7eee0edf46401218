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

/// Represent the address in given address space.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GuestAddress(pub u64);

impl GuestAddress {
    /// Get the raw value of `GuestAddress`.
    pub fn raw_value(self) -> u64 {
        self.0
    }

    /// Get the offset of this address from the given address.
    /// The caller has to guarantee no underflow occurs.
    ///
    /// # Arguments
    ///
    /// * `other` - Other `GuestAddress`.
    pub fn offset_from(self, other: Self) -> u64 {
        self.raw_value() - other.raw_value()
    }

    /// Return address of this address plus the given offset, return None if overflows.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset address.
    pub fn checked_add(self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

/// Address range specified by base address and length.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AddressRange {
    /// Base address.
    pub base: GuestAddress,
    /// Size of memory segment.
    pub size: u64,
}

impl From<(u64, u64)> for AddressRange {
    fn from(range: (u64, u64)) -> AddressRange {
        AddressRange {
            base: GuestAddress(range.0),
            size: range.1,
        }
    }
}

impl AddressRange {
    /// Create a new `AddressRange`.
    pub fn new(base: GuestAddress, size: u64) -> AddressRange {
        AddressRange { base, size }
    }

    /// The end address of this range, exclusive. None if it overflows.
    pub fn end_addr(&self) -> Option<GuestAddress> {
        self.base.checked_add(self.size)
    }

    /// Whether `[addr, addr + count)` lies entirely within this range.
    pub fn contains(&self, addr: GuestAddress, count: u64) -> bool {
        if addr < self.base {
            return false;
        }
        match (addr.checked_add(count), self.end_addr()) {
            (Some(end), Some(range_end)) => end <= range_end,
            _ => false,
        }
    }

    /// Whether this range shares at least one byte with `other`.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        let self_end = self.base.0.saturating_add(self.size);
        let other_end = other.base.0.saturating_add(other.size);
        self.base.0 < other_end && other.base.0 < self_end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_address_add() {
        let addr = GuestAddress(0x1000);
        assert_eq!(addr.checked_add(0x20), Some(GuestAddress(0x1020)));
        assert_eq!(GuestAddress(u64::MAX).checked_add(1), None);
        assert_eq!(GuestAddress(0x1010).offset_from(addr), 0x10);
    }

    #[test]
    fn test_range_contains() {
        let range = AddressRange::from((0x1000, 0x100));
        assert!(range.contains(GuestAddress(0x1000), 0x100));
        assert!(range.contains(GuestAddress(0x10f0), 0x10));
        assert!(!range.contains(GuestAddress(0x10f0), 0x11));
        assert!(!range.contains(GuestAddress(0xfff), 1));
        assert!(!range.contains(GuestAddress(u64::MAX), 2));
    }

    #[test]
    fn test_range_overlaps() {
        let range = AddressRange::from((0x1000, 0x100));
        assert!(range.overlaps(&AddressRange::from((0x10ff, 0x10))));
        assert!(range.overlaps(&AddressRange::from((0x0, 0x2000))));
        assert!(!range.overlaps(&AddressRange::from((0x1100, 0x10))));
        assert!(!range.overlaps(&AddressRange::from((0x0, 0x1000))));
        assert!(!range.overlaps(&AddressRange::from((0x1000, 0))));
    }
}
