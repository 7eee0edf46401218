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

//! Interrupt aggregation.
//!
//! Endpoint interrupt registers fold into the device all-endpoints status, which folds into
//! the IN/OUT summary bits of the core interrupt status, which drives the interrupt line
//! through the core interrupt mask. Every mutation of a source register goes through
//! [`UsbOtg::update_ep_irq`] or [`UsbOtg::update_irq`].

use log::trace;

use super::endpoint::EpDirection;
use super::regs::{USB_INT_IEPINT, USB_INT_OEPINT};
use super::UsbOtg;
use crate::sysbus::SysBusDevOps;

const DAINT_IN_MASK: u32 = 0xffff;

/// Set or clear `daint_bit` in `daint_sts` according to whether the endpoint has pending events.
pub fn fold_endpoint(daint_sts: u32, daint_bit: u32, pending: bool) -> u32 {
    if pending {
        daint_sts | daint_bit
    } else {
        daint_sts & !daint_bit
    }
}

/// Recompute the IN and OUT endpoint summary bits of `gint_sts`.
pub fn summarize(gint_sts: u32, daint_sts: u32, daint_msk: u32) -> u32 {
    let active = daint_sts & daint_msk;
    let mut gint_sts = gint_sts & !(USB_INT_IEPINT | USB_INT_OEPINT);
    if active & DAINT_IN_MASK != 0 {
        gint_sts |= USB_INT_IEPINT;
    }
    if active >> 16 != 0 {
        gint_sts |= USB_INT_OEPINT;
    }
    gint_sts
}

/// Level of the interrupt line.
pub fn line_level(gint_sts: u32, gint_msk: u32) -> bool {
    gint_sts & gint_msk != 0
}

impl UsbOtg {
    /// Propagate the interrupt register of one endpoint up to the interrupt line.
    pub(super) fn update_ep_irq(&mut self, dir: EpDirection, n: usize) {
        let ep = self.ep(dir, n);
        let (daint_bit, pending) = (ep.daint_bit(), ep.interrupt != 0);
        let regs = &mut self.state.regs;
        regs.daint_sts = fold_endpoint(regs.daint_sts, daint_bit, pending);
        self.update_summary();
        self.update_irq();
    }

    /// Recompute the endpoint summary bits after `daint_sts` or `daint_msk` changed.
    pub(super) fn update_summary(&mut self) {
        let regs = &mut self.state.regs;
        regs.gint_sts = summarize(regs.gint_sts, regs.daint_sts, regs.daint_msk);
    }

    /// Drive the interrupt line from the core interrupt status and mask.
    pub(super) fn update_irq(&mut self) {
        let regs = &self.state.regs;
        let level = line_level(regs.gint_sts, regs.gint_msk);
        trace!(
            "usb otg irq: gint_sts {:#x} gint_msk {:#x} level {}",
            regs.gint_sts,
            regs.gint_msk,
            level
        );
        self.set_irq_level(level);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fold_endpoint() {
        assert_eq!(fold_endpoint(0, 1 << 2, true), 1 << 2);
        assert_eq!(fold_endpoint(0x5, 1 << 2, false), 0x1);
        assert_eq!(fold_endpoint(0x1, 1 << 18, true), 0x4_0001);
    }

    #[test]
    fn test_summarize() {
        // IN endpoint 2 pending and unmasked.
        assert_eq!(summarize(0x20, 1 << 2, 0xffff), 0x20 | USB_INT_IEPINT);
        // OUT endpoint 1 pending but masked off.
        assert_eq!(summarize(USB_INT_OEPINT, 1 << 17, 0xffff), 0);
        // Both.
        assert_eq!(
            summarize(0, 0x0002_0001, 0xffff_ffff),
            USB_INT_IEPINT | USB_INT_OEPINT
        );
    }

    #[test]
    fn test_line_level() {
        assert!(!line_level(0x0400_0020, 0));
        assert!(line_level(USB_INT_IEPINT, USB_INT_IEPINT));
        assert!(!line_level(USB_INT_IEPINT, USB_INT_OEPINT));
    }
}
