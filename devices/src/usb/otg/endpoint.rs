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

use super::regs::{EpReg, OTG_EP_ENABLE, OTG_XFER_SIZE_MASK};

// Bit positions of the endpoint interrupt register. IN and OUT endpoints share the
// positions, some of them with a different meaning per direction.
const EP_INT_XFERCOMPL_SHIFT: u32 = 0;
const EP_INT_EPDISABLED_SHIFT: u32 = 1;
const EP_INT_AHBERR_SHIFT: u32 = 2;
const EP_INT_SETUP_TIMEOUT_SHIFT: u32 = 3;
const EP_INT_TOKEN_SHIFT: u32 = 4;
const EP_INT_MISMATCH_SHIFT: u32 = 5;
const EP_INT_NAK_B2B_SHIFT: u32 = 6;
const EP_INT_TXFEMP_SHIFT: u32 = 7;
const EP_INT_PKTERR_SHIFT: u32 = 8;
const EP_INT_BNA_SHIFT: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpDirection {
    In,
    Out,
}

/// Interrupt events of an IN endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InEndpointEvent {
    /// Transfer Completed
    XferCompl,
    /// Endpoint Disabled
    EpDisabled,
    /// AHB Error
    AhbErr,
    /// Timeout Condition
    Timeout,
    /// IN Token Received When TxFIFO is Empty
    InTknTxfEmp,
    /// IN Token Received with EP Mismatch
    InTknEpMis,
    /// IN Endpoint NAK Effective
    InEpNakEff,
    /// Transmit FIFO Empty
    TxfEmp,
    /// FIFO Underrun
    TxfifoUndrn,
    /// Buffer Not Available
    BnaIntr,
}

impl InEndpointEvent {
    pub fn bit(self) -> u32 {
        let shift = match self {
            InEndpointEvent::XferCompl => EP_INT_XFERCOMPL_SHIFT,
            InEndpointEvent::EpDisabled => EP_INT_EPDISABLED_SHIFT,
            InEndpointEvent::AhbErr => EP_INT_AHBERR_SHIFT,
            InEndpointEvent::Timeout => EP_INT_SETUP_TIMEOUT_SHIFT,
            InEndpointEvent::InTknTxfEmp => EP_INT_TOKEN_SHIFT,
            InEndpointEvent::InTknEpMis => EP_INT_MISMATCH_SHIFT,
            InEndpointEvent::InEpNakEff => EP_INT_NAK_B2B_SHIFT,
            InEndpointEvent::TxfEmp => EP_INT_TXFEMP_SHIFT,
            InEndpointEvent::TxfifoUndrn => EP_INT_PKTERR_SHIFT,
            InEndpointEvent::BnaIntr => EP_INT_BNA_SHIFT,
        };
        1 << shift
    }
}

/// Interrupt events of an OUT endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutEndpointEvent {
    /// Transfer Completed
    XferCompl,
    /// Endpoint Disabled
    EpDisabled,
    /// AHB Error
    AhbErr,
    /// SETUP Phase Done
    Setup,
    /// OUT Token Received When Endpoint Disabled
    OutTknEpDis,
    /// Status Phase Received For Control Write
    StsPhseRcvd,
    /// Back-to-Back SETUP Packets Received
    Back2BackSetup,
    /// Transmit FIFO Empty
    TxfEmp,
    /// OUT Packet Error
    OutPktErr,
    /// Buffer Not Available
    BnaIntr,
}

impl OutEndpointEvent {
    pub fn bit(self) -> u32 {
        let shift = match self {
            OutEndpointEvent::XferCompl => EP_INT_XFERCOMPL_SHIFT,
            OutEndpointEvent::EpDisabled => EP_INT_EPDISABLED_SHIFT,
            OutEndpointEvent::AhbErr => EP_INT_AHBERR_SHIFT,
            OutEndpointEvent::Setup => EP_INT_SETUP_TIMEOUT_SHIFT,
            OutEndpointEvent::OutTknEpDis => EP_INT_TOKEN_SHIFT,
            OutEndpointEvent::StsPhseRcvd => EP_INT_MISMATCH_SHIFT,
            OutEndpointEvent::Back2BackSetup => EP_INT_NAK_B2B_SHIFT,
            OutEndpointEvent::TxfEmp => EP_INT_TXFEMP_SHIFT,
            OutEndpointEvent::OutPktErr => EP_INT_PKTERR_SHIFT,
            OutEndpointEvent::BnaIntr => EP_INT_BNA_SHIFT,
        };
        1 << shift
    }
}

/// One endpoint of the device controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtgEndpoint {
    /// Endpoint number.
    pub n: usize,
    pub dir: EpDirection,
    pub ctrl: u32,
    pub interrupt: u32,
    pub transfer_size: u32,
    pub dma_addr: u32,
    /// Guest address just past the last received byte.
    pub dma_buf: u32,
    /// Transmit FIFO size. Only addressable for IN endpoints but kept for both.
    pub fifo_size: u32,
}

impl OtgEndpoint {
    pub fn new(n: usize, dir: EpDirection) -> Self {
        OtgEndpoint {
            n,
            dir,
            ctrl: 0,
            interrupt: 0,
            transfer_size: 0,
            dma_addr: 0,
            dma_buf: 0,
            fifo_size: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = OtgEndpoint::new(self.n, self.dir);
    }

    pub fn enabled(&self) -> bool {
        self.ctrl & OTG_EP_ENABLE != 0
    }

    /// Bytes left in the programmed transfer.
    pub fn xfer_len(&self) -> u32 {
        self.transfer_size & OTG_XFER_SIZE_MASK
    }

    /// Bit of this endpoint in the device all-endpoints interrupt registers.
    pub fn daint_bit(&self) -> u32 {
        match self.dir {
            EpDirection::In => 1 << self.n,
            EpDirection::Out => 1 << (self.n + 16),
        }
    }

    pub fn get(&self, reg: EpReg) -> u32 {
        match reg {
            EpReg::Ctrl => self.ctrl,
            EpReg::Interrupt => self.interrupt,
            EpReg::TransferSize => self.transfer_size,
            EpReg::DmaAddr => self.dma_addr,
            EpReg::DmaBuf => self.dma_buf,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_event_bits() {
        assert_eq!(InEndpointEvent::XferCompl.bit(), 1 << 0);
        assert_eq!(InEndpointEvent::TxfEmp.bit(), 1 << 7);
        assert_eq!(OutEndpointEvent::Setup.bit(), 1 << 3);
        // Same position, different meaning per direction.
        assert_eq!(InEndpointEvent::Timeout.bit(), OutEndpointEvent::Setup.bit());
        assert_eq!(
            InEndpointEvent::TxfifoUndrn.bit(),
            OutEndpointEvent::OutPktErr.bit()
        );
        assert_eq!(OutEndpointEvent::AhbErr.bit(), 1 << 2);
    }

    #[test]
    fn test_endpoint() {
        let mut ep = OtgEndpoint::new(3, EpDirection::Out);
        assert_eq!(ep.daint_bit(), 1 << 19);
        assert!(!ep.enabled());

        ep.ctrl = OTG_EP_ENABLE | 0x40;
        ep.transfer_size = 0x8008_0040;
        ep.dma_buf = 0x1234;
        assert!(ep.enabled());
        assert_eq!(ep.xfer_len(), 0x40);
        assert_eq!(ep.get(EpReg::DmaBuf), 0x1234);

        ep.reset();
        assert_eq!(ep, OtgEndpoint::new(3, EpDirection::Out));
        assert_eq!(OtgEndpoint::new(3, EpDirection::In).daint_bit(), 1 << 3);
    }
}
