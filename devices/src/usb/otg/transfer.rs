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

//! Bulk data transfers between guest memory and the network backend.
//!
//! Transfers run synchronously inside the register write that enables the endpoint. An IN
//! endpoint sends its whole programmed transfer as one frame. An OUT endpoint receives the
//! single frame staged from the backend, if it fits.

use log::{debug, error, warn};

use super::endpoint::{EpDirection, InEndpointEvent, OutEndpointEvent};
use super::regs::{OTG_EP_COUNT, OTG_EP_ENABLE};
use super::{UsbOtg, OTG_BUF_SIZE};

impl UsbOtg {
    /// Send the programmed transfer of IN endpoint `n` to the backend.
    pub(super) fn transmit(&mut self, n: usize) {
        let ep = &self.state.ep_in[n];
        let (dma_addr, len) = (ep.dma_addr, ep.xfer_len());

        let events = match self.dma_read(dma_addr, len) {
            Ok(packet) => {
                debug!("usb otg: ep_in[{}] sends {} bytes", n, packet.len());
                self.send_packet(&packet);
                InEndpointEvent::XferCompl.bit() | InEndpointEvent::TxfEmp.bit()
            }
            Err(e) => {
                error!("usb otg: ep_in[{}] transmit failed: {:?}", n, e);
                InEndpointEvent::AhbErr.bit()
            }
        };
        self.state.ep_in[n].interrupt |= events;
        self.update_ep_irq(EpDirection::In, n);
    }

    /// Copy the staged frame into the buffer of OUT endpoint `n`.
    pub(super) fn receive_into(&mut self, n: usize) {
        let size = self.state.buf.len() as u32;
        if size > self.state.ep_out[n].xfer_len() {
            warn!(
                "usb otg: {} bytes frame exceeds transfer size of ep_out[{}], dropped",
                size, n
            );
            self.state.buf_full = false;
            return;
        }

        let dma_addr = self.state.ep_out[n].dma_addr;
        let result = self.dma_write(dma_addr, &self.state.buf);
        let ep = &mut self.state.ep_out[n];
        match result {
            Ok(()) => {
                debug!("usb otg: ep_out[{}] receives {} bytes", n, size);
                ep.dma_buf = dma_addr.wrapping_add(size);
                ep.transfer_size -= size;
                ep.interrupt |= OutEndpointEvent::XferCompl.bit();
            }
            Err(e) => {
                error!("usb otg: ep_out[{}] receive failed: {:?}", n, e);
                ep.interrupt |= OutEndpointEvent::AhbErr.bit();
            }
        }
        ep.ctrl &= !OTG_EP_ENABLE;
        self.state.buf_full = false;
        self.update_ep_irq(EpDirection::Out, n);
    }

    /// Whether the staging buffer can take a frame.
    pub fn can_receive(&self) -> bool {
        !self.state.buf_full
    }

    /// Take one frame from the network backend. The frame is staged and delivered to the
    /// first armed bulk OUT endpoint, or kept until one is armed.
    ///
    /// Return the number of bytes accepted, 0 if the frame was dropped.
    pub fn receive(&mut self, packet: &[u8]) -> usize {
        if self.state.buf_full {
            warn!(
                "usb otg: staging buffer full, {} bytes frame dropped",
                packet.len()
            );
            return 0;
        }
        if packet.len() > OTG_BUF_SIZE {
            warn!(
                "usb otg: {} bytes frame exceeds staging buffer of {} bytes, dropped",
                packet.len(),
                OTG_BUF_SIZE
            );
            return 0;
        }

        self.state.buf.clear();
        self.state.buf.extend_from_slice(packet);
        self.state.buf_full = true;
        if let Some(n) = (1..OTG_EP_COUNT).find(|&n| self.state.ep_out[n].enabled()) {
            self.receive_into(n);
        }
        packet.len()
    }
}
