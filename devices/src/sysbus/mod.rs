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

pub mod error;

pub use error::SysBusError;

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use log::{debug, error};

use crate::{Device, DeviceBase, IrqState, LineIrqManager};
use address_space::{AddressSpace, GuestAddress, Region, RegionOps};

// 0-31 is private to each CPU (SGIs and PPIs).
pub const IRQ_BASE: i32 = 32;
pub const IRQ_MAX: i32 = 191;

pub struct SysBus {
    pub sys_mem: Arc<AddressSpace>,
    pub free_irqs: (i32, i32),
    pub min_free_irq: i32,
    pub irq_manager: Option<Arc<dyn LineIrqManager>>,
    devices: Vec<Arc<Mutex<dyn SysBusDevOps>>>,
}

impl fmt::Debug for SysBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysBus")
            .field("sys_mem", &self.sys_mem.name())
            .field("free_irqs", &self.free_irqs)
            .field("min_free_irq", &self.min_free_irq)
            .field("devices", &self.devices.len())
            .finish()
    }
}

impl SysBus {
    pub fn new(
        sys_mem: &Arc<AddressSpace>,
        free_irqs: (i32, i32),
        irq_manager: Option<Arc<dyn LineIrqManager>>,
    ) -> Self {
        Self {
            sys_mem: sys_mem.clone(),
            free_irqs,
            min_free_irq: free_irqs.0,
            irq_manager,
            devices: Vec::new(),
        }
    }

    pub fn build_region_ops<T: 'static + SysBusDevOps>(&self, dev: &Arc<Mutex<T>>) -> RegionOps {
        let cloned_dev = dev.clone();
        let read_ops = move |data: &mut [u8], addr: GuestAddress, offset: u64| -> bool {
            cloned_dev.lock().unwrap().read(data, addr, offset)
        };

        let cloned_dev = dev.clone();
        let write_ops = move |data: &[u8], addr: GuestAddress, offset: u64| -> bool {
            cloned_dev.lock().unwrap().write(data, addr, offset)
        };

        RegionOps {
            read: Arc::new(read_ops),
            write: Arc::new(write_ops),
        }
    }

    pub fn attach_device<T: 'static + SysBusDevOps>(&mut self, dev: &Arc<Mutex<T>>) -> Result<()> {
        let res = dev.lock().unwrap().get_sys_resource().clone();
        let region_base = res.region_base;
        let region_size = res.region_size;

        // region_base/region_size are both 0 means this device doesn't have its own memory layout.
        if region_base != 0 && region_size != 0 {
            let region_ops = self.build_region_ops(dev);
            let region = Region::init_io_region(region_size, region_ops, &res.region_name);
            self.sys_mem
                .add_region(region, GuestAddress(region_base))
                .with_context(|| SysBusError::AddRegionErr("memory", region_base, region_size))?;
        }

        debug!(
            "Attach {} to sysbus: base {:#x} size {:#x} irq {}",
            res.region_name, region_base, region_size, res.irq
        );
        self.devices.push(dev.clone());
        Ok(())
    }

    /// Reset every attached device.
    pub fn reset(&self) -> Result<()> {
        for dev in self.devices.iter() {
            let mut locked_dev = dev.lock().unwrap();
            let name = locked_dev.name();
            locked_dev
                .reset()
                .with_context(|| format!("Failed to reset sysbus device {}", name))?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SysRes {
    // Note: region_base/region_size are both 0 means that this device doesn't have its own memory layout.
    pub region_base: u64,
    pub region_size: u64,
    pub region_name: String,
    pub irq: i32,
}

impl Default for SysRes {
    fn default() -> Self {
        Self {
            region_base: 0,
            region_size: 0,
            region_name: "".to_string(),
            irq: -1,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SysBusDevType {
    UsbOtg,
    Others,
}

#[derive(Clone)]
pub struct SysBusDevBase {
    pub base: DeviceBase,
    /// System bus device type.
    pub dev_type: SysBusDevType,
    /// System resource.
    pub res: SysRes,
    /// Interrupt state.
    pub irq_state: IrqState,
}

impl Default for SysBusDevBase {
    fn default() -> Self {
        SysBusDevBase {
            base: DeviceBase::default(),
            dev_type: SysBusDevType::Others,
            res: SysRes::default(),
            irq_state: IrqState::default(),
        }
    }
}

impl SysBusDevBase {
    pub fn new(dev_type: SysBusDevType) -> SysBusDevBase {
        Self {
            dev_type,
            ..Default::default()
        }
    }

    pub fn set_sys(&mut self, irq: i32, region_base: u64, region_size: u64, region_name: &str) {
        self.res.irq = irq;
        self.res.region_base = region_base;
        self.res.region_size = region_size;
        self.res.region_name = region_name.to_string();
    }
}

/// Operations for sysbus devices.
pub trait SysBusDevOps: Device + Send {
    fn sysbusdev_base(&self) -> &SysBusDevBase;

    fn sysbusdev_base_mut(&mut self) -> &mut SysBusDevBase;

    /// Read function of device.
    ///
    /// # Arguments
    ///
    /// * `data` - A u8-type array.
    /// * `base` - Base address of this device.
    /// * `offset` - Offset from base address.
    fn read(&mut self, data: &mut [u8], base: GuestAddress, offset: u64) -> bool;

    /// Write function of device.
    ///
    /// # Arguments
    ///
    /// * `data` - A u8-type array.
    /// * `base` - Base address of this device.
    /// * `offset` - Offset from base address.
    fn write(&mut self, data: &[u8], base: GuestAddress, offset: u64) -> bool;

    fn get_irq(&self, sysbus: &mut SysBus) -> Result<i32> {
        let irq = sysbus.min_free_irq;
        if irq > sysbus.free_irqs.1 {
            return Err(anyhow!(SysBusError::IrqExhausted(
                sysbus.free_irqs.0,
                sysbus.free_irqs.1
            )));
        }

        sysbus.min_free_irq = irq + 1;
        Ok(irq)
    }

    fn get_sys_resource(&mut self) -> &mut SysRes {
        &mut self.sysbusdev_base_mut().res
    }

    fn set_sys_resource(
        &mut self,
        sysbus: &Arc<Mutex<SysBus>>,
        region_base: u64,
        region_size: u64,
        region_name: &str,
    ) -> Result<()> {
        let mut locked_sysbus = sysbus.lock().unwrap();
        let irq = self.get_irq(&mut locked_sysbus)?;
        let irq_manager = locked_sysbus.irq_manager.clone();
        drop(locked_sysbus);

        self.sysbusdev_base_mut().irq_state = IrqState::new(irq as u32, irq_manager);
        self.sysbusdev_base_mut()
            .set_sys(irq, region_base, region_size, region_name);
        Ok(())
    }

    /// Drive the level triggered line of this device.
    fn set_irq_level(&self, level: bool) {
        let irq_state = &self.sysbusdev_base().irq_state;
        irq_state.set_irq_level(level).unwrap_or_else(|e| {
            error!(
                "Device {:?} failed to set interrupt level {}: {:?}",
                self.sysbusdev_base().dev_type,
                level,
                e
            )
        });
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::interrupt_controller::test::RecordingIrqManager;
    use address_space::HostMemMapping;

    pub const RAM_SIZE: u64 = 0x10_0000;

    /// A system bus over 1 MiB of RAM at guest address 0 and a recording interrupt manager.
    pub fn sysbus_init() -> (Arc<Mutex<SysBus>>, Arc<RecordingIrqManager>) {
        let sys_mem = AddressSpace::new("sys_mem");
        let ram = Arc::new(HostMemMapping::new(GuestAddress(0), RAM_SIZE));
        sys_mem
            .add_region(Region::init_ram_region(ram, "ram"), GuestAddress(0))
            .unwrap();
        let irq_manager = Arc::new(RecordingIrqManager::default());
        let sysbus = SysBus::new(&sys_mem, (IRQ_BASE, IRQ_MAX), Some(irq_manager.clone()));
        (Arc::new(Mutex::new(sysbus)), irq_manager)
    }

    struct Scratch {
        base: SysBusDevBase,
        reg: u32,
        resets: u32,
    }

    impl Device for Scratch {
        fn device_base(&self) -> &DeviceBase {
            &self.base.base
        }

        fn device_base_mut(&mut self) -> &mut DeviceBase {
            &mut self.base.base
        }
    }

    impl SysBusDevOps for Scratch {
        fn sysbusdev_base(&self) -> &SysBusDevBase {
            &self.base
        }

        fn sysbusdev_base_mut(&mut self) -> &mut SysBusDevBase {
            &mut self.base
        }

        fn read(&mut self, data: &mut [u8], _base: GuestAddress, offset: u64) -> bool {
            offset == 0 && util::num_ops::write_data_u32(data, self.reg)
        }

        fn write(&mut self, data: &[u8], _base: GuestAddress, offset: u64) -> bool {
            match util::num_ops::read_data_u32(data) {
                Some(value) if offset == 0 => {
                    self.reg = value;
                    self.set_irq_level(value != 0);
                    true
                }
                _ => false,
            }
        }

        fn reset(&mut self) -> Result<()> {
            self.reg = 0;
            self.resets += 1;
            Ok(())
        }
    }

    fn scratch() -> Scratch {
        Scratch {
            base: SysBusDevBase::new(SysBusDevType::Others),
            reg: 0,
            resets: 0,
        }
    }

    #[test]
    fn test_attach_device() {
        let (sysbus, irq_manager) = sysbus_init();
        let mut dev = scratch();
        dev.set_sys_resource(&sysbus, 0x20_0000, 0x100, "scratch").unwrap();
        assert_eq!(dev.get_sys_resource().irq, IRQ_BASE);
        let dev = Arc::new(Mutex::new(dev));
        sysbus.lock().unwrap().attach_device(&dev).unwrap();

        let sys_mem = sysbus.lock().unwrap().sys_mem.clone();
        sys_mem
            .write(&mut [5_u8, 0, 0, 0].as_slice(), GuestAddress(0x20_0000), 4)
            .unwrap();
        assert_eq!(dev.lock().unwrap().reg, 5);
        assert_eq!(irq_manager.level(IRQ_BASE as u32), Some(true));

        let mut data = Vec::new();
        sys_mem.read(&mut data, GuestAddress(0x20_0000), 4).unwrap();
        assert_eq!(data, vec![5, 0, 0, 0]);
        // The device refuses offset 4.
        assert!(sys_mem.read(&mut data, GuestAddress(0x20_0004), 4).is_err());

        sysbus.lock().unwrap().reset().unwrap();
        assert_eq!(dev.lock().unwrap().reg, 0);
        assert_eq!(dev.lock().unwrap().resets, 1);
    }

    #[test]
    fn test_attach_overlap() {
        let (sysbus, _) = sysbus_init();
        let mut dev = scratch();
        // Overlaps the RAM region.
        dev.set_sys_resource(&sysbus, 0xf_ff00, 0x200, "scratch").unwrap();
        let dev = Arc::new(Mutex::new(dev));
        assert!(sysbus.lock().unwrap().attach_device(&dev).is_err());
    }

    #[test]
    fn test_irq_exhausted() {
        let (sysbus, _) = sysbus_init();
        sysbus.lock().unwrap().min_free_irq = IRQ_MAX + 1;
        let mut dev = scratch();
        assert!(dev.set_sys_resource(&sysbus, 0x20_0000, 0x100, "scratch").is_err());
    }
}
