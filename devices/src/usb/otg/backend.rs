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

use anyhow::{anyhow, Context, Result};
use log::{trace, warn};

use super::UsbOtg;
use crate::usb::UsbError;
use address_space::{AddressRange, GuestAddress};

/// Host side of the network link carried over the OTG bulk endpoints.
pub trait NetBackend: Send + Sync {
    /// Send one frame from the guest to the host network.
    fn send(&self, packet: &[u8]) -> Result<()>;
}

impl UsbOtg {
    /// Read `len` bytes of guest memory at `addr`.
    pub(super) fn dma_read(&self, addr: u32, len: u32) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len as usize);
        if len == 0 {
            return Ok(data);
        }
        self.check_dma_range(addr, len, "read")?;
        self.sys_mem
            .read(&mut data, GuestAddress(u64::from(addr)), u64::from(len))
            .with_context(|| UsbError::DmaFailed("read", u64::from(len), u64::from(addr)))?;
        trace!("usb otg: dma read {} bytes at {:#x}", len, addr);
        Ok(data)
    }

    /// Write `data` to guest memory at `addr`.
    pub(super) fn dma_write(&self, addr: u32, data: &[u8]) -> Result<()> {
        let len = data.len() as u32;
        if len == 0 {
            return Ok(());
        }
        self.check_dma_range(addr, len, "write")?;
        let mut src = data;
        self.sys_mem
            .write(&mut src, GuestAddress(u64::from(addr)), u64::from(len))
            .with_context(|| UsbError::DmaFailed("write", u64::from(len), u64::from(addr)))?;
        trace!("usb otg: dma write {} bytes at {:#x}", len, addr);
        Ok(())
    }

    // DMA into the controller's own register window would re-enter the device.
    fn check_dma_range(&self, addr: u32, len: u32, op: &'static str) -> Result<()> {
        let res = &self.base.res;
        let window = AddressRange::from((res.region_base, res.region_size));
        if window.overlaps(&AddressRange::from((u64::from(addr), u64::from(len)))) {
            return Err(anyhow!(UsbError::DmaFailed(
                op,
                u64::from(len),
                u64::from(addr)
            )));
        }
        Ok(())
    }

    /// Hand a frame to the network backend.
    pub(super) fn send_packet(&self, packet: &[u8]) {
        match &self.backend {
            Some(backend) => {
                if let Err(e) = backend.send(packet) {
                    warn!("usb otg: failed to send {} bytes: {:?}", packet.len(), e);
                }
            }
            None => warn!(
                "usb otg: no network backend, {} bytes dropped",
                packet.len()
            ),
        }
    }
}
