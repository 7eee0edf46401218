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

//! Snapshot of the controller state.
//!
//! All fields are big endian, in this order:
//!
//! ```text
//! PHY power clock reset tune0 tune1                            5 x u32
//! gotg_ctl .. doep_msk, see GlobalReg::ALL                     17 x u32
//! enumeration state                                            u8
//! for n in 0..16:
//!     ep_in[n]  ctrl interrupt transfer_size dma_addr dma_buf fifo_size   6 x u32
//!     ep_out[n] ctrl interrupt transfer_size dma_addr dma_buf fifo_size   6 x u32
//! staged frame length                                          u32
//! staged frame                                                 length x u8
//! buf_full                                                     u8
//! ```
//!
//! The network backend is not part of the snapshot.

use std::io::{Cursor, Read};

use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::info;

use super::endpoint::OtgEndpoint;
use super::enumeration::OtgState;
use super::regs::{GlobalReg, PhyReg};
use super::{UsbOtg, UsbOtgState, OTG_BUF_SIZE};
use migration::{DeviceStateDesc, MigrationError, StateTransfer};

/// Name of the device state in a snapshot.
pub const USB_OTG_SNAPSHOT_NAME: &str = "s5pc1xx.usb.otg";
const USB_OTG_SNAPSHOT_VERSION: u32 = 1;

fn put_endpoint(buf: &mut Vec<u8>, ep: &OtgEndpoint) -> std::io::Result<()> {
    for value in [
        ep.ctrl,
        ep.interrupt,
        ep.transfer_size,
        ep.dma_addr,
        ep.dma_buf,
        ep.fifo_size,
    ] {
        buf.write_u32::<BigEndian>(value)?;
    }
    Ok(())
}

fn get_endpoint(cursor: &mut Cursor<&[u8]>, ep: &mut OtgEndpoint) -> std::io::Result<()> {
    ep.ctrl = cursor.read_u32::<BigEndian>()?;
    ep.interrupt = cursor.read_u32::<BigEndian>()?;
    ep.transfer_size = cursor.read_u32::<BigEndian>()?;
    ep.dma_addr = cursor.read_u32::<BigEndian>()?;
    ep.dma_buf = cursor.read_u32::<BigEndian>()?;
    ep.fifo_size = cursor.read_u32::<BigEndian>()?;
    Ok(())
}

impl UsbOtgState {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for reg in PhyReg::ALL {
            buf.write_u32::<BigEndian>(self.phy.get(reg))
                .map_err(MigrationError::from)?;
        }
        for reg in GlobalReg::ALL {
            buf.write_u32::<BigEndian>(self.regs.get(reg))
                .map_err(MigrationError::from)?;
        }
        buf.push(self.state as u8);
        for (ep_in, ep_out) in self.ep_in.iter().zip(self.ep_out.iter()) {
            put_endpoint(&mut buf, ep_in).map_err(MigrationError::from)?;
            put_endpoint(&mut buf, ep_out).map_err(MigrationError::from)?;
        }
        buf.write_u32::<BigEndian>(self.buf.len() as u32)
            .map_err(MigrationError::from)?;
        buf.extend_from_slice(&self.buf);
        buf.push(u8::from(self.buf_full));
        Ok(buf)
    }

    /// Decode a snapshot. Nothing is applied unless the whole snapshot is valid.
    pub fn from_bytes(bytes: &[u8]) -> Result<UsbOtgState> {
        let mut cursor = Cursor::new(bytes);
        let mut state = UsbOtgState::default();

        for reg in PhyReg::ALL {
            let value = cursor
                .read_u32::<BigEndian>()
                .map_err(MigrationError::from)?;
            state.phy.set(reg, value);
        }
        for reg in GlobalReg::ALL {
            let value = cursor
                .read_u32::<BigEndian>()
                .map_err(MigrationError::from)?;
            state.regs.set(reg, value);
        }
        let otg_state = cursor.read_u8().map_err(MigrationError::from)?;
        state.state = OtgState::try_from(otg_state)
            .map_err(|_| MigrationError::InvalidField("state", u64::from(otg_state)))?;
        for (ep_in, ep_out) in state.ep_in.iter_mut().zip(state.ep_out.iter_mut()) {
            get_endpoint(&mut cursor, ep_in).map_err(MigrationError::from)?;
            get_endpoint(&mut cursor, ep_out).map_err(MigrationError::from)?;
        }

        let buf_size = cursor
            .read_u32::<BigEndian>()
            .map_err(MigrationError::from)?;
        if buf_size as usize > OTG_BUF_SIZE {
            return Err(anyhow!(MigrationError::InvalidField(
                "buf_size",
                u64::from(buf_size)
            )));
        }
        state.buf.resize(buf_size as usize, 0);
        cursor
            .read_exact(&mut state.buf)
            .map_err(MigrationError::from)?;
        state.buf_full = match cursor.read_u8().map_err(MigrationError::from)? {
            0 => false,
            1 => true,
            value => {
                return Err(anyhow!(MigrationError::InvalidField(
                    "buf_full",
                    u64::from(value)
                )))
            }
        };

        if cursor.position() != bytes.len() as u64 {
            return Err(anyhow!(MigrationError::FromBytesError(
                "trailing bytes after usb otg state"
            )));
        }
        Ok(state)
    }
}

impl StateTransfer for UsbOtg {
    fn get_state_vec(&self) -> migration::Result<Vec<u8>> {
        self.state.to_bytes()
    }

    fn set_state_mut(&mut self, state: &[u8], version: u32) -> migration::Result<()> {
        if version != USB_OTG_SNAPSHOT_VERSION {
            return Err(anyhow!(MigrationError::UnsupportedVersion(
                USB_OTG_SNAPSHOT_NAME.to_string(),
                version
            )));
        }
        self.state = UsbOtgState::from_bytes(state)?;
        info!(
            "usb otg {}: state restored, {:?}",
            self.base.base.id, self.state.state
        );
        self.update_irq();
        Ok(())
    }

    fn state_desc(&self) -> DeviceStateDesc {
        DeviceStateDesc::new(
            USB_OTG_SNAPSHOT_NAME,
            USB_OTG_SNAPSHOT_VERSION,
            USB_OTG_SNAPSHOT_VERSION,
        )
    }
}
