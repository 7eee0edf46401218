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

//! Register layout of the S5PC1xx USB OTG controller.
//!
//! ```text
//! 0x000      0x034   0x100      0x140   0x810     0x820   0x900     0xB00     0xD00   0x100000  0x100028
//! | globals  |       | IN fifo  |       | dev msk |       | IN eps  | OUT eps |       | PHY      |
//! ```

/// Size of the MMIO window.
pub const USB_OTG_MMIO_SIZE: u64 = 0x10_0030;
/// Endpoints per direction.
pub const OTG_EP_COUNT: usize = 16;

/// Global interrupt status bits.
/// USB Reset
pub const USB_INT_USBRST: u32 = 1 << 12;
/// Enumeration Done
pub const USB_INT_ENUMDONE: u32 = 1 << 13;
/// IN Endpoints Interrupt
pub const USB_INT_IEPINT: u32 = 1 << 18;
/// OUT Endpoints Interrupt
pub const USB_INT_OEPINT: u32 = 1 << 19;
/// Bits of gint_sts that a guest write can't clear.
pub const GINTSTS_RO_MASK: u32 = (7 << 24) | (3 << 18) | (0xf << 4) | 0x5;

/// Reset control bits.
/// Core Soft Reset
pub const GRSTCTL_CSFTRST: u32 = 1 << 0;
/// Soft reset and FIFO flush requests.
pub const GRSTCTL_RESET_MASK: u32 = 0xf;
/// Self clearing bits.
pub const GRSTCTL_SELF_CLEAR: u32 = 0x3f;

/// Endpoint control bits.
/// Endpoint Enable
pub const OTG_EP_ENABLE: u32 = 1 << 31;
/// Endpoint Disable request
pub const OTG_EP_DISABLE: u32 = 1 << 30;
/// Set NAK and Clear NAK requests.
pub const OTG_EP_NAK_MASK: u32 = 0xC << 24;
/// Significant bits of the transfer size register.
pub const OTG_XFER_SIZE_MASK: u32 = 0x7ffff;

/// A PHY reset write with any of these bits set resets the controller.
pub const PHY_RESET_MASK: u32 = 0x1f;

const OTG_FIFO_BASE: u64 = 0x100;
const OTG_FIFO_END: u64 = 0x140;
const OTG_IN_EP_BASE: u64 = 0x900;
const OTG_OUT_EP_BASE: u64 = 0xB00;
const OTG_EP_END: u64 = 0xD00;
const OTG_EP_REG_SHIFT: u64 = 5;
const OTG_EP_REG_MASK: u64 = 0x1f;
const OTG_PHY_BASE: u64 = 0x10_0000;
const OTG_PHY_END: u64 = 0x10_0028;

/// USB PHY control registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyReg {
    Power,
    Clock,
    Reset,
    Tune0,
    Tune1,
}

impl PhyReg {
    pub const ALL: [PhyReg; 5] = [
        PhyReg::Power,
        PhyReg::Clock,
        PhyReg::Reset,
        PhyReg::Tune0,
        PhyReg::Tune1,
    ];

    fn from_offset(offset: u64) -> Option<PhyReg> {
        match offset {
            0x00 => Some(PhyReg::Power),
            0x04 => Some(PhyReg::Clock),
            0x08 => Some(PhyReg::Reset),
            0x20 => Some(PhyReg::Tune0),
            0x24 => Some(PhyReg::Tune1),
            _ => None,
        }
    }
}

/// Core global and device-mode registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalReg {
    GotgCtl,
    GotgInt,
    GahbCfg,
    GusbCfg,
    GrstCtl,
    GintSts,
    GintMsk,
    GrxStsr,
    GrxStsp,
    GrxFsiz,
    GnptxFsiz,
    GnptxSts,
    HnptxFsiz,
    DaintSts,
    DaintMsk,
    DiepMsk,
    DoepMsk,
}

impl GlobalReg {
    /// All global registers in snapshot order.
    pub const ALL: [GlobalReg; 17] = [
        GlobalReg::GotgCtl,
        GlobalReg::GotgInt,
        GlobalReg::GahbCfg,
        GlobalReg::GusbCfg,
        GlobalReg::GrstCtl,
        GlobalReg::GintSts,
        GlobalReg::GintMsk,
        GlobalReg::GrxStsr,
        GlobalReg::GrxStsp,
        GlobalReg::GrxFsiz,
        GlobalReg::GnptxFsiz,
        GlobalReg::GnptxSts,
        GlobalReg::HnptxFsiz,
        GlobalReg::DaintSts,
        GlobalReg::DaintMsk,
        GlobalReg::DiepMsk,
        GlobalReg::DoepMsk,
    ];

    fn from_offset(offset: u64) -> Option<GlobalReg> {
        let reg = match offset {
            0x00 => GlobalReg::GotgCtl,
            0x04 => GlobalReg::GotgInt,
            0x08 => GlobalReg::GahbCfg,
            0x0C => GlobalReg::GusbCfg,
            0x10 => GlobalReg::GrstCtl,
            0x14 => GlobalReg::GintSts,
            0x18 => GlobalReg::GintMsk,
            0x1C => GlobalReg::GrxStsr,
            0x20 => GlobalReg::GrxStsp,
            0x24 => GlobalReg::GrxFsiz,
            0x28 => GlobalReg::GnptxFsiz,
            0x2C => GlobalReg::GnptxSts,
            0x30 => GlobalReg::HnptxFsiz,
            0x810 => GlobalReg::DiepMsk,
            0x814 => GlobalReg::DoepMsk,
            0x818 => GlobalReg::DaintSts,
            0x81C => GlobalReg::DaintMsk,
            _ => return None,
        };
        Some(reg)
    }

    /// Registers the guest can only read. Writes to them are ignored.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            GlobalReg::GrxStsr | GlobalReg::GrxStsp | GlobalReg::GnptxSts | GlobalReg::DaintSts
        )
    }
}

/// Registers of one endpoint block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpReg {
    Ctrl,
    Interrupt,
    TransferSize,
    DmaAddr,
    DmaBuf,
}

impl EpReg {
    fn from_offset(offset: u64) -> Option<EpReg> {
        match offset {
            0x00 => Some(EpReg::Ctrl),
            0x08 => Some(EpReg::Interrupt),
            0x10 => Some(EpReg::TransferSize),
            0x14 => Some(EpReg::DmaAddr),
            0x1C => Some(EpReg::DmaBuf),
            _ => None,
        }
    }
}

/// A decoded offset of the MMIO window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtgReg {
    Phy(PhyReg),
    Global(GlobalReg),
    /// Transmit FIFO size of an IN endpoint.
    InFifoSize(usize),
    InEp(usize, EpReg),
    OutEp(usize, EpReg),
}

impl OtgReg {
    /// Decode an offset of the MMIO window. Return None for offsets no register lives at.
    pub fn decode(offset: u64) -> Option<OtgReg> {
        if (OTG_PHY_BASE..OTG_PHY_END).contains(&offset) {
            return PhyReg::from_offset(offset - OTG_PHY_BASE).map(OtgReg::Phy);
        }
        if (OTG_FIFO_BASE..OTG_FIFO_END).contains(&offset) {
            return Some(OtgReg::InFifoSize(((offset - OTG_FIFO_BASE) >> 2) as usize));
        }
        if (OTG_IN_EP_BASE..OTG_OUT_EP_BASE).contains(&offset) {
            let (n, reg) = Self::decode_ep(offset - OTG_IN_EP_BASE)?;
            return Some(OtgReg::InEp(n, reg));
        }
        if (OTG_OUT_EP_BASE..OTG_EP_END).contains(&offset) {
            let (n, reg) = Self::decode_ep(offset - OTG_OUT_EP_BASE)?;
            return Some(OtgReg::OutEp(n, reg));
        }
        GlobalReg::from_offset(offset).map(OtgReg::Global)
    }

    fn decode_ep(offset: u64) -> Option<(usize, EpReg)> {
        let reg = EpReg::from_offset(offset & OTG_EP_REG_MASK)?;
        Some(((offset >> OTG_EP_REG_SHIFT) as usize, reg))
    }
}

/// USB PHY control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyRegs {
    pub power: u32,
    pub clock: u32,
    pub reset: u32,
    pub tune0: u32,
    pub tune1: u32,
}

impl PhyRegs {
    pub fn reset(&mut self) {
        self.power = 0x0000_01F9;
        self.clock = 0;
        self.reset = 0x0000_0009;
        self.tune0 = 0x0009_19B3;
        self.tune1 = 0x0009_19B3;
    }

    pub fn get(&self, reg: PhyReg) -> u32 {
        match reg {
            PhyReg::Power => self.power,
            PhyReg::Clock => self.clock,
            PhyReg::Reset => self.reset,
            PhyReg::Tune0 => self.tune0,
            PhyReg::Tune1 => self.tune1,
        }
    }

    pub fn set(&mut self, reg: PhyReg, value: u32) {
        match reg {
            PhyReg::Power => self.power = value,
            PhyReg::Clock => self.clock = value,
            PhyReg::Reset => self.reset = value,
            PhyReg::Tune0 => self.tune0 = value,
            PhyReg::Tune1 => self.tune1 = value,
        }
    }
}

/// Core global and device-mode register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalRegs {
    pub gotg_ctl: u32,
    pub gotg_int: u32,
    pub gahb_cfg: u32,
    pub gusb_cfg: u32,
    pub grst_ctl: u32,
    pub gint_sts: u32,
    pub gint_msk: u32,
    pub grx_stsr: u32,
    pub grx_stsp: u32,
    pub grx_fsiz: u32,
    pub gnptx_fsiz: u32,
    pub gnptx_sts: u32,
    pub hnptx_fsiz: u32,
    pub daint_sts: u32,
    pub daint_msk: u32,
    pub diep_msk: u32,
    pub doep_msk: u32,
}

impl GlobalRegs {
    pub fn reset(&mut self) {
        *self = GlobalRegs {
            gotg_ctl: 0x0001_0000,
            gusb_cfg: 0x0000_1408,
            grst_ctl: 0x8000_0000,
            gint_sts: 0x0400_0020,
            ..Default::default()
        };
    }

    pub fn get(&self, reg: GlobalReg) -> u32 {
        match reg {
            GlobalReg::GotgCtl => self.gotg_ctl,
            GlobalReg::GotgInt => self.gotg_int,
            GlobalReg::GahbCfg => self.gahb_cfg,
            GlobalReg::GusbCfg => self.gusb_cfg,
            GlobalReg::GrstCtl => self.grst_ctl,
            GlobalReg::GintSts => self.gint_sts,
            GlobalReg::GintMsk => self.gint_msk,
            GlobalReg::GrxStsr => self.grx_stsr,
            GlobalReg::GrxStsp => self.grx_stsp,
            GlobalReg::GrxFsiz => self.grx_fsiz,
            GlobalReg::GnptxFsiz => self.gnptx_fsiz,
            GlobalReg::GnptxSts => self.gnptx_sts,
            GlobalReg::HnptxFsiz => self.hnptx_fsiz,
            GlobalReg::DaintSts => self.daint_sts,
            GlobalReg::DaintMsk => self.daint_msk,
            GlobalReg::DiepMsk => self.diep_msk,
            GlobalReg::DoepMsk => self.doep_msk,
        }
    }

    pub fn set(&mut self, reg: GlobalReg, value: u32) {
        let field = match reg {
            GlobalReg::GotgCtl => &mut self.gotg_ctl,
            GlobalReg::GotgInt => &mut self.gotg_int,
            GlobalReg::GahbCfg => &mut self.gahb_cfg,
            GlobalReg::GusbCfg => &mut self.gusb_cfg,
            GlobalReg::GrstCtl => &mut self.grst_ctl,
            GlobalReg::GintSts => &mut self.gint_sts,
            GlobalReg::GintMsk => &mut self.gint_msk,
            GlobalReg::GrxStsr => &mut self.grx_stsr,
            GlobalReg::GrxStsp => &mut self.grx_stsp,
            GlobalReg::GrxFsiz => &mut self.grx_fsiz,
            GlobalReg::GnptxFsiz => &mut self.gnptx_fsiz,
            GlobalReg::GnptxSts => &mut self.gnptx_sts,
            GlobalReg::HnptxFsiz => &mut self.hnptx_fsiz,
            GlobalReg::DaintSts => &mut self.daint_sts,
            GlobalReg::DaintMsk => &mut self.daint_msk,
            GlobalReg::DiepMsk => &mut self.diep_msk,
            GlobalReg::DoepMsk => &mut self.doep_msk,
        };
        *field = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_globals() {
        assert_eq!(OtgReg::decode(0x00), Some(OtgReg::Global(GlobalReg::GotgCtl)));
        assert_eq!(OtgReg::decode(0x14), Some(OtgReg::Global(GlobalReg::GintSts)));
        assert_eq!(OtgReg::decode(0x30), Some(OtgReg::Global(GlobalReg::HnptxFsiz)));
        assert_eq!(OtgReg::decode(0x818), Some(OtgReg::Global(GlobalReg::DaintSts)));
        assert_eq!(OtgReg::decode(0x81C), Some(OtgReg::Global(GlobalReg::DaintMsk)));
        assert_eq!(OtgReg::decode(0x34), None);
        assert_eq!(OtgReg::decode(0x800), None);
        assert_eq!(OtgReg::decode(0x12), None);
    }

    #[test]
    fn test_decode_fifo_and_endpoints() {
        assert_eq!(OtgReg::decode(0x100), Some(OtgReg::InFifoSize(0)));
        assert_eq!(OtgReg::decode(0x13C), Some(OtgReg::InFifoSize(15)));
        assert_eq!(OtgReg::decode(0x140), None);

        assert_eq!(OtgReg::decode(0x900), Some(OtgReg::InEp(0, EpReg::Ctrl)));
        assert_eq!(OtgReg::decode(0x948), Some(OtgReg::InEp(2, EpReg::Interrupt)));
        assert_eq!(OtgReg::decode(0xAFC), Some(OtgReg::InEp(15, EpReg::DmaBuf)));
        assert_eq!(OtgReg::decode(0xB14), Some(OtgReg::OutEp(0, EpReg::DmaAddr)));
        assert_eq!(OtgReg::decode(0xCF0), Some(OtgReg::OutEp(15, EpReg::TransferSize)));
        assert_eq!(OtgReg::decode(0x904), None);
        assert_eq!(OtgReg::decode(0xB18), None);
        assert_eq!(OtgReg::decode(0xD00), None);
    }

    #[test]
    fn test_decode_phy() {
        assert_eq!(OtgReg::decode(0x10_0000), Some(OtgReg::Phy(PhyReg::Power)));
        assert_eq!(OtgReg::decode(0x10_0008), Some(OtgReg::Phy(PhyReg::Reset)));
        assert_eq!(OtgReg::decode(0x10_0024), Some(OtgReg::Phy(PhyReg::Tune1)));
        assert_eq!(OtgReg::decode(0x10_000C), None);
        assert_eq!(OtgReg::decode(0x10_0028), None);
    }

    #[test]
    fn test_reset_values() {
        let mut phy = PhyRegs::default();
        phy.reset();
        assert_eq!(phy.get(PhyReg::Power), 0x1F9);
        assert_eq!(phy.get(PhyReg::Reset), 0x9);
        assert_eq!(phy.get(PhyReg::Tune1), 0x919B3);

        let mut regs = GlobalRegs::default();
        regs.set(GlobalReg::DaintMsk, 0xffff);
        regs.reset();
        assert_eq!(regs.get(GlobalReg::GotgCtl), 0x10000);
        assert_eq!(regs.get(GlobalReg::GusbCfg), 0x1408);
        assert_eq!(regs.get(GlobalReg::GrstCtl), 0x8000_0000);
        assert_eq!(regs.get(GlobalReg::GintSts), 0x0400_0020);
        assert_eq!(regs.get(GlobalReg::DaintMsk), 0);
    }
}
