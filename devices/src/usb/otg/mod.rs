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

//! # S5PC1xx USB OTG
//!
//! Device mode emulation of the USB On-The-Go controller of the S5PC1xx SoC. The link carries
//! raw ethernet frames between the guest driver and a host network backend: bulk IN
//! endpoints transmit guest buffers as frames, bulk OUT endpoints receive frames from the
//! backend. Enumeration is synthesized by the controller itself, see [`OtgState`].

mod backend;
mod endpoint;
mod enumeration;
mod interrupt;
mod regs;
mod snapshot;
mod transfer;

pub use backend::NetBackend;
pub use endpoint::{EpDirection, InEndpointEvent, OtgEndpoint, OutEndpointEvent};
pub use enumeration::{OtgState, SetupRequest};
pub use regs::{GlobalRegs, PhyRegs, OTG_EP_COUNT, USB_OTG_MMIO_SIZE};
pub use snapshot::USB_OTG_SNAPSHOT_NAME;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};

use crate::sysbus::{SysBus, SysBusDevBase, SysBusDevOps, SysBusDevType};
use crate::usb::UsbError;
use crate::{Device, DeviceBase};
use address_space::{AddressSpace, GuestAddress};
use machine_manager::config::{str_to_num, valid_id, valid_mac};
use regs::*;
use util::num_ops::{read_data_u32, write_data_u32};

/// Size of the staging buffer for frames from the network backend.
pub const OTG_BUF_SIZE: usize = 1600;
/// Mac address used when none is configured.
pub const USB_OTG_DEFAULT_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];
/// MMIO base of the controller on S5PC110 boards, used when none is configured.
pub const USB_OTG_DEFAULT_BASE: u64 = 0xEC00_0000;

/// Config structure for s5pc1xx-usb-otg.
#[derive(Parser, Debug, Clone, Default)]
#[command(no_binary_name(true))]
pub struct UsbOtgConfig {
    #[arg(long, value_parser = ["s5pc1xx-usb-otg"])]
    pub classtype: String,
    #[arg(long, value_parser = valid_id)]
    pub id: String,
    /// Id of the host network backend. The machine looks it up and hands the backend to
    /// [`UsbOtg::attach_backend`].
    #[arg(long)]
    pub netdev: Option<String>,
    #[arg(long, value_parser = valid_mac)]
    pub mac: Option<[u8; 6]>,
    #[arg(long, value_parser = str_to_num)]
    pub addr: Option<u64>,
}

impl UsbOtgConfig {
    pub fn mac_addr(&self) -> [u8; 6] {
        self.mac.unwrap_or(USB_OTG_DEFAULT_MAC)
    }

    pub fn region_base(&self) -> u64 {
        self.addr.unwrap_or(USB_OTG_DEFAULT_BASE)
    }
}

/// Registers, endpoints and staged frame of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbOtgState {
    pub phy: PhyRegs,
    pub regs: GlobalRegs,
    pub state: OtgState,
    pub ep_in: [OtgEndpoint; OTG_EP_COUNT],
    pub ep_out: [OtgEndpoint; OTG_EP_COUNT],
    /// Last frame staged from the network backend.
    pub buf: Vec<u8>,
    /// The staged frame is not delivered yet.
    pub buf_full: bool,
}

impl Default for UsbOtgState {
    fn default() -> Self {
        let mut state = UsbOtgState {
            phy: PhyRegs::default(),
            regs: GlobalRegs::default(),
            state: OtgState::Start,
            ep_in: std::array::from_fn(|n| OtgEndpoint::new(n, EpDirection::In)),
            ep_out: std::array::from_fn(|n| OtgEndpoint::new(n, EpDirection::Out)),
            buf: Vec::with_capacity(OTG_BUF_SIZE),
            buf_full: false,
        };
        state.reset();
        state
    }
}

impl UsbOtgState {
    /// Power-on reset.
    pub fn reset(&mut self) {
        self.phy.reset();
        self.regs.reset();
        for ep in self.ep_in.iter_mut().chain(self.ep_out.iter_mut()) {
            ep.reset();
        }
        self.state = OtgState::Start;
        self.buf.clear();
        self.buf_full = false;
    }

    /// Reset requested by the guest through the PHY or the reset control register.
    pub fn soft_reset(&mut self) {
        self.reset();
        self.state = OtgState::Reset;
        self.regs.gotg_ctl = self.regs.gotg_ctl.wrapping_add(0x000C_0000);
        self.regs.gint_sts |= USB_INT_USBRST;
    }
}

/// S5PC1xx USB OTG controller.
pub struct UsbOtg {
    base: SysBusDevBase,
    state: UsbOtgState,
    mac: [u8; 6],
    /// Id of the network backend this controller is meant to be attached to.
    netdev: Option<String>,
    /// Base of the register window.
    region_base: u64,
    /// Guest memory for endpoint DMA.
    sys_mem: Arc<AddressSpace>,
    backend: Option<Arc<dyn NetBackend>>,
}

impl UsbOtg {
    pub fn new(config: &UsbOtgConfig, sys_mem: &Arc<AddressSpace>) -> Self {
        UsbOtg {
            base: SysBusDevBase {
                base: DeviceBase::new(config.id.clone()),
                ..SysBusDevBase::new(SysBusDevType::UsbOtg)
            },
            state: UsbOtgState::default(),
            mac: config.mac_addr(),
            netdev: config.netdev.clone(),
            region_base: config.region_base(),
            sys_mem: sys_mem.clone(),
            backend: None,
        }
    }

    /// Map the register window at the configured base and wire the interrupt line.
    pub fn realize(mut self, sysbus: &Arc<Mutex<SysBus>>) -> Result<Arc<Mutex<UsbOtg>>> {
        let name = self.name();
        let region_base = self.region_base;
        self.set_sys_resource(sysbus, region_base, USB_OTG_MMIO_SIZE, "s5pc1xx-usb-otg")
            .with_context(|| format!("Failed to allocate system resource for {}", name))?;
        self.update_irq();

        let dev = Arc::new(Mutex::new(self));
        sysbus
            .lock()
            .unwrap()
            .attach_device(&dev)
            .with_context(|| format!("Failed to attach {} to sysbus", name))?;
        info!("usb otg {} realized at {:#x}", name, region_base);
        Ok(dev)
    }

    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    pub fn otg_state(&self) -> OtgState {
        self.state.state
    }

    /// Id of the network backend the machine should pass to [`UsbOtg::attach_backend`].
    pub fn netdev(&self) -> Option<&str> {
        self.netdev.as_deref()
    }

    pub fn attach_backend(&mut self, backend: Arc<dyn NetBackend>) {
        info!(
            "usb otg {}: network backend {:?} attached",
            self.name(),
            self.netdev
        );
        self.backend = Some(backend);
    }

    /// Called when the network backend goes away.
    pub fn detach_backend(&mut self) {
        self.backend = None;
    }

    fn ep(&self, dir: EpDirection, n: usize) -> &OtgEndpoint {
        match dir {
            EpDirection::In => &self.state.ep_in[n],
            EpDirection::Out => &self.state.ep_out[n],
        }
    }

    fn ep_mut(&mut self, dir: EpDirection, n: usize) -> &mut OtgEndpoint {
        match dir {
            EpDirection::In => &mut self.state.ep_in[n],
            EpDirection::Out => &mut self.state.ep_out[n],
        }
    }

    fn soft_reset(&mut self) {
        info!("usb otg {}: soft reset", self.name());
        self.state.soft_reset();
    }

    fn read_reg(&self, offset: u64) -> Result<u32> {
        let reg =
            OtgReg::decode(offset).ok_or_else(|| anyhow!(UsbError::BadOffset("read", offset)))?;
        let value = match reg {
            OtgReg::Phy(reg) => self.state.phy.get(reg),
            OtgReg::Global(reg) => self.state.regs.get(reg),
            OtgReg::InFifoSize(n) => self.state.ep_in[n].fifo_size,
            OtgReg::InEp(n, reg) => self.state.ep_in[n].get(reg),
            OtgReg::OutEp(n, reg) => self.state.ep_out[n].get(reg),
        };
        Ok(value)
    }

    fn write_reg(&mut self, offset: u64, value: u32) -> Result<()> {
        let reg =
            OtgReg::decode(offset).ok_or_else(|| anyhow!(UsbError::BadOffset("write", offset)))?;
        match reg {
            OtgReg::Phy(reg) => self.write_phy(reg, value),
            OtgReg::Global(reg) => self.write_global(reg, value),
            OtgReg::InFifoSize(n) => self.state.ep_in[n].fifo_size = value,
            OtgReg::InEp(n, reg) => self.write_ep(EpDirection::In, n, reg, value),
            OtgReg::OutEp(n, reg) => self.write_ep(EpDirection::Out, n, reg, value),
        }
        Ok(())
    }

    fn write_phy(&mut self, reg: PhyReg, value: u32) {
        match reg {
            PhyReg::Reset => {
                if value & PHY_RESET_MASK != 0 {
                    self.soft_reset();
                    self.update_irq();
                }
            }
            _ => self.state.phy.set(reg, value),
        }
    }

    fn write_global(&mut self, reg: GlobalReg, value: u32) {
        match reg {
            GlobalReg::GotgInt => {
                self.state.regs.gotg_int &= !value;
                self.update_irq();
            }
            GlobalReg::GrstCtl => {
                if value & GRSTCTL_CSFTRST != 0 {
                    self.soft_reset();
                } else if value & GRSTCTL_RESET_MASK != 0 {
                    self.state.regs.gint_sts |= USB_INT_USBRST;
                    self.state.state = OtgState::Reset;
                }
                self.state.regs.grst_ctl = value & !GRSTCTL_SELF_CLEAR;
                self.update_irq();
            }
            GlobalReg::GintSts => {
                let value = value & !GINTSTS_RO_MASK;
                self.state.regs.gint_sts &= !value;
                if value == USB_INT_USBRST {
                    info!("usb otg {}: bus reset acknowledged", self.name());
                    self.state.regs.gint_sts |= USB_INT_ENUMDONE;
                    self.state.state = OtgState::SpeedDetect;
                    self.enumerate();
                }
                if value == USB_INT_ENUMDONE {
                    info!("usb otg {}: enumeration acknowledged", self.name());
                    self.state.state = OtgState::SetConfigSent;
                    self.enumerate();
                }
                self.update_irq();
            }
            GlobalReg::GintMsk => {
                self.state.regs.gint_msk = value;
                self.update_irq();
            }
            GlobalReg::DiepMsk => {
                self.state.regs.diep_msk = value;
                for n in 0..OTG_EP_COUNT {
                    self.update_ep_irq(EpDirection::In, n);
                }
            }
            GlobalReg::DoepMsk => {
                self.state.regs.doep_msk = value;
                for n in 0..OTG_EP_COUNT {
                    self.update_ep_irq(EpDirection::Out, n);
                }
            }
            GlobalReg::DaintMsk => {
                self.state.regs.daint_msk = value;
                self.update_summary();
                self.update_irq();
            }
            reg if reg.is_read_only() => {
                warn!(
                    "usb otg {}: write {:#x} to read-only register {:?} ignored",
                    self.name(),
                    value,
                    reg
                );
            }
            reg => self.state.regs.set(reg, value),
        }
    }

    fn write_ep(&mut self, dir: EpDirection, n: usize, reg: EpReg, value: u32) {
        match reg {
            EpReg::Ctrl => self.write_ep_ctrl(dir, n, value),
            EpReg::Interrupt => {
                self.ep_mut(dir, n).interrupt &= !value;
                self.update_ep_irq(dir, n);
            }
            EpReg::TransferSize => self.ep_mut(dir, n).transfer_size = value,
            EpReg::DmaAddr => self.ep_mut(dir, n).dma_addr = value,
            EpReg::DmaBuf => {
                warn!(
                    "usb otg {}: write {:#x} to read-only dma buffer of {:?} endpoint {} ignored",
                    self.name(),
                    value,
                    dir,
                    n
                );
            }
        }
    }

    fn write_ep_ctrl(&mut self, dir: EpDirection, n: usize, mut value: u32) {
        let ep = self.ep_mut(dir, n);
        if value & OTG_EP_DISABLE != 0 && ep.enabled() {
            ep.ctrl &= !OTG_EP_ENABLE;
            // Endpoint Disabled has the same position for both directions.
            ep.interrupt |= InEndpointEvent::EpDisabled.bit();
            self.update_ep_irq(dir, n);
        }
        value &= !OTG_EP_DISABLE;

        let enable = value & OTG_EP_ENABLE != 0;
        if enable {
            match (dir, n) {
                (EpDirection::In, 0) => self.status_stage(),
                (EpDirection::In, _) => {
                    self.transmit(n);
                    value &= !OTG_EP_ENABLE;
                }
                (EpDirection::Out, 0) => {}
                (EpDirection::Out, _) => {
                    if self.state.buf_full {
                        self.receive_into(n);
                        value &= !OTG_EP_ENABLE;
                    }
                }
            }
        }
        value &= !OTG_EP_NAK_MASK;
        self.ep_mut(dir, n).ctrl = value;

        if enable {
            self.enumerate();
        }
    }
}

impl Device for UsbOtg {
    fn device_base(&self) -> &DeviceBase {
        &self.base.base
    }

    fn device_base_mut(&mut self) -> &mut DeviceBase {
        &mut self.base.base
    }
}

impl SysBusDevOps for UsbOtg {
    fn sysbusdev_base(&self) -> &SysBusDevBase {
        &self.base
    }

    fn sysbusdev_base_mut(&mut self) -> &mut SysBusDevBase {
        &mut self.base
    }

    fn read(&mut self, data: &mut [u8], _base: GuestAddress, offset: u64) -> bool {
        match self.read_reg(offset) {
            Ok(value) => {
                debug!("usb otg read: offset {:#x} value {:#x}", offset, value);
                write_data_u32(data, value)
            }
            Err(e) => {
                error!("usb otg {}: {:?}", self.name(), e);
                false
            }
        }
    }

    fn write(&mut self, data: &[u8], _base: GuestAddress, offset: u64) -> bool {
        let value = match read_data_u32(data) {
            Some(value) => value,
            None => return false,
        };
        debug!("usb otg write: offset {:#x} value {:#x}", offset, value);
        if let Err(e) = self.write_reg(offset, value) {
            error!("usb otg {}: {:?}", self.name(), e);
            return false;
        }
        true
    }

    fn reset(&mut self) -> Result<()> {
        info!("usb otg {}: reset", self.name());
        self.state.reset();
        self.update_irq();
        Ok(())
    }
}
