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

//! # Interrupt Controller
//!
//! Interfaces between interrupt sources and the interrupt controller of the machine.
//!
//! A device owns an [`IrqState`] bound to one level triggered line. The state forwards level
//! changes to the [`LineIrqManager`] provided by the machine, so the device model never knows
//! how the interrupt is delivered.

mod error;

pub use anyhow::Result;
pub use error::InterruptError;

use std::sync::Arc;

use anyhow::anyhow;
use log::trace;

/// Line interrupt delivery offered by the machine.
pub trait LineIrqManager: Send + Sync {
    /// Drive line `gsi` to `level`.
    fn set_level_irq(&self, gsi: u32, level: bool) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct IrqState {
    pub irq: u32,
    irq_handler: Option<Arc<dyn LineIrqManager>>,
}

impl IrqState {
    pub fn new(irq: u32, irq_handler: Option<Arc<dyn LineIrqManager>>) -> Self {
        IrqState { irq, irq_handler }
    }

    /// Set the level of the line.
    pub fn set_irq_level(&self, level: bool) -> Result<()> {
        trace!("irq {} level {}", self.irq, level);
        self.handler()?.set_level_irq(self.irq, level)
    }

    fn handler(&self) -> Result<&Arc<dyn LineIrqManager>> {
        self.irq_handler
            .as_ref()
            .ok_or_else(|| anyhow!(InterruptError::NoIrqManager(self.irq)))
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Mutex;

    use super::*;

    /// Records every line change, in order.
    #[derive(Default)]
    pub struct RecordingIrqManager {
        pub events: Mutex<Vec<(u32, bool)>>,
    }

    impl RecordingIrqManager {
        /// Last level driven on `gsi`, if any.
        pub fn level(&self, gsi: u32) -> Option<bool> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(irq, _)| *irq == gsi)
                .map(|(_, level)| *level)
        }
    }

    impl LineIrqManager for RecordingIrqManager {
        fn set_level_irq(&self, gsi: u32, level: bool) -> Result<()> {
            self.events.lock().unwrap().push((gsi, level));
            Ok(())
        }
    }

    #[test]
    fn test_irq_state_level() {
        let manager = Arc::new(RecordingIrqManager::default());
        let state = IrqState::new(40, Some(manager.clone()));

        state.set_irq_level(true).unwrap();
        assert_eq!(manager.level(40), Some(true));
        state.set_irq_level(false).unwrap();
        assert_eq!(manager.level(40), Some(false));
        assert_eq!(*manager.events.lock().unwrap(), vec![(40, true), (40, false)]);
    }

    #[test]
    fn test_irq_state_without_manager() {
        let state = IrqState::new(5, None);
        let err = state.set_irq_level(true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InterruptError>(),
            Some(InterruptError::NoIrqManager(5))
        ));
    }
}
