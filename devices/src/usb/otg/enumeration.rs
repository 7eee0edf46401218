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

//! Synthesized enumeration.
//!
//! No USB host sits on the other side of the controller. Once the guest driver has
//! acknowledged the bus reset and enumeration, the controller plays the host's part by
//! writing canned SETUP packets into the control OUT endpoint and advancing on the guest's
//! status stage on the control IN endpoint:
//!
//! ```text
//! Start/Reset --ack USBRST--> SpeedDetect --ack ENUMDONE--> SetConfigSent
//! SetConfigSent --ep_out[0] armed--> SetConfigWait --ep_in[0] armed--> SetIfaceSent
//! SetIfaceSent --ep_out[0] armed--> SetIfaceWait --ep_in[0] armed--> Operational
//! ```

use anyhow::{anyhow, Result};
use log::{error, info};

use super::endpoint::{EpDirection, InEndpointEvent, OutEndpointEvent};
use super::regs::OTG_EP_ENABLE;
use super::UsbOtg;
use crate::usb::config::*;
use crate::usb::{UsbDeviceRequest, UsbError};

/// Enumeration progress of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OtgState {
    #[default]
    Start = 0,
    Reset,
    SpeedDetect,
    SetConfigSent,
    SetConfigWait,
    SetConfigDone,
    SetIfaceSent,
    SetIfaceWait,
    SetIfaceDone,
    Operational,
}

impl TryFrom<u8> for OtgState {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        let state = match value {
            0 => OtgState::Start,
            1 => OtgState::Reset,
            2 => OtgState::SpeedDetect,
            3 => OtgState::SetConfigSent,
            4 => OtgState::SetConfigWait,
            5 => OtgState::SetConfigDone,
            6 => OtgState::SetIfaceSent,
            7 => OtgState::SetIfaceWait,
            8 => OtgState::SetIfaceDone,
            9 => OtgState::Operational,
            _ => return Err(anyhow!(UsbError::InvalidState(value))),
        };
        Ok(state)
    }
}

impl OtgState {
    /// The SETUP packet to deliver in this state once the control OUT endpoint is armed, and
    /// the state that follows its delivery.
    pub fn pending_setup(self) -> Option<(SetupRequest, OtgState)> {
        match self {
            OtgState::SetConfigSent => {
                Some((SetupRequest::SetConfiguration, OtgState::SetConfigWait))
            }
            OtgState::SetIfaceSent => Some((SetupRequest::SetInterface, OtgState::SetIfaceWait)),
            _ => None,
        }
    }

    /// The state that follows the guest's status stage on the control IN endpoint.
    pub fn after_status_stage(self) -> Option<OtgState> {
        match self {
            OtgState::SetConfigWait => Some(OtgState::SetIfaceSent),
            OtgState::SetIfaceWait => Some(OtgState::Operational),
            _ => None,
        }
    }
}

/// Standard requests the controller can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupRequest {
    /// GET_DESCRIPTOR(DEVICE), 64 bytes.
    GetDescriptor,
    /// SET_CONFIGURATION(1).
    SetConfiguration,
    /// SET_INTERFACE(interface 1, alternate setting 1).
    SetInterface,
}

impl SetupRequest {
    pub fn request(self) -> UsbDeviceRequest {
        match self {
            SetupRequest::GetDescriptor => UsbDeviceRequest {
                request_type: USB_DEVICE_IN_REQUEST,
                request: USB_REQUEST_GET_DESCRIPTOR,
                value: (USB_DT_DEVICE as u16) << 8,
                index: 0,
                length: 0x40,
            },
            SetupRequest::SetConfiguration => UsbDeviceRequest {
                request_type: USB_DEVICE_OUT_REQUEST,
                request: USB_REQUEST_SET_CONFIGURATION,
                value: 1,
                index: 0,
                length: 0,
            },
            SetupRequest::SetInterface => UsbDeviceRequest {
                request_type: USB_INTERFACE_OUT_REQUEST,
                request: USB_REQUEST_SET_INTERFACE,
                value: 1,
                index: 1,
                length: 0,
            },
        }
    }

    pub fn packet(self) -> [u8; USB_SETUP_PACKET_SIZE] {
        self.request().to_setup_packet()
    }
}

impl UsbOtg {
    /// Deliver the pending SETUP packet if the control OUT endpoint is armed.
    pub(super) fn enumerate(&mut self) {
        let (setup, next) = match self.state.state.pending_setup() {
            Some(pending) => pending,
            None => return,
        };
        if !self.state.ep_out[0].enabled() {
            return;
        }

        let dma_addr = self.state.ep_out[0].dma_addr;
        let events = match self.dma_write(dma_addr, &setup.packet()) {
            Ok(()) => {
                info!("usb otg: {:?} delivered, {:?} -> {:?}", setup, self.state.state, next);
                self.state.state = next;
                OutEndpointEvent::Setup.bit() | OutEndpointEvent::XferCompl.bit()
            }
            Err(e) => {
                error!("usb otg: failed to deliver {:?}: {:?}", setup, e);
                OutEndpointEvent::AhbErr.bit()
            }
        };
        let ep = &mut self.state.ep_out[0];
        ep.ctrl &= !OTG_EP_ENABLE;
        ep.interrupt |= events;
        self.update_ep_irq(EpDirection::Out, 0);
    }

    /// The guest armed the control IN endpoint for a status stage.
    pub(super) fn status_stage(&mut self) {
        self.state.ep_in[0].interrupt |=
            InEndpointEvent::XferCompl.bit() | InEndpointEvent::TxfEmp.bit();
        if let Some(next) = self.state.state.after_status_stage() {
            info!("usb otg: status stage, {:?} -> {:?}", self.state.state, next);
            self.state.state = next;
        }
        self.update_ep_irq(EpDirection::In, 0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_setup_packets() {
        assert_eq!(
            SetupRequest::GetDescriptor.packet(),
            [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00]
        );
        assert_eq!(
            SetupRequest::SetConfiguration.packet(),
            [0x00, 0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            SetupRequest::SetInterface.packet(),
            [0x01, 0x0B, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_state_byte() {
        for value in 0..10_u8 {
            let state = OtgState::try_from(value).unwrap();
            assert_eq!(state as u8, value);
        }
        assert!(OtgState::try_from(10_u8).is_err());
    }

    #[test]
    fn test_transitions() {
        assert_eq!(
            OtgState::SetConfigSent.pending_setup(),
            Some((SetupRequest::SetConfiguration, OtgState::SetConfigWait))
        );
        assert_eq!(
            OtgState::SetIfaceSent.pending_setup(),
            Some((SetupRequest::SetInterface, OtgState::SetIfaceWait))
        );
        assert_eq!(OtgState::SpeedDetect.pending_setup(), None);
        assert_eq!(
            OtgState::SetConfigWait.after_status_stage(),
            Some(OtgState::SetIfaceSent)
        );
        assert_eq!(
            OtgState::SetIfaceWait.after_status_stage(),
            Some(OtgState::Operational)
        );
        assert_eq!(OtgState::Operational.after_status_stage(), None);
    }
}
