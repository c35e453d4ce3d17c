//! 单元测试共用的假 GPIO。

use crate::led::GpioBank;

/// 模拟输出寄存器：按掩码写入电平，并统计写入次数。
#[derive(Debug, Default)]
pub(crate) struct FakeGpio {
    pub(crate) levels: u64,
    pub(crate) writes: usize,
}

impl GpioBank for FakeGpio {
    fn write(&mut self, pin_mask: u64, value_mask: u64) {
        self.levels = (self.levels & !pin_mask) | (value_mask & pin_mask);
        self.writes += 1;
    }

    fn output_levels(&self) -> u64 {
        self.levels
    }
}
