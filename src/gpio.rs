use esp_idf_hal::gpio::{AnyOutputPin, Level, Output, Pin, PinDriver};
use esp_idf_hal::sys::{EspError, GPIO_OUT_W1TC_REG, GPIO_OUT_W1TS_REG};

use crate::led::{set_clear_masks, GpioBank};

const LOW_BANK: u64 = 0xFFFF_FFFF;

/// 由若干 `PinDriver` 组成的输出组，按 GPIO 编号映射到位掩码。
///
/// `PinDriver` 只负责把引脚配置为输出；GPIO0..31 的电平通过 W1TS/W1TC
/// 寄存器一次写入，一个掩码内的引脚同时翻转。
pub struct EspGpioBank {
    pins: Vec<(u8, PinDriver<'static, AnyOutputPin, Output>)>,
    owned: u64,
}

impl EspGpioBank {
    pub fn new(pins: impl IntoIterator<Item = AnyOutputPin>) -> Result<Self, EspError> {
        let mut drivers = Vec::new();
        let mut owned = 0u64;
        for pin in pins {
            let number = pin.pin() as u8;
            owned |= 1u64 << number;
            drivers.push((number, PinDriver::output(pin)?));
        }
        Ok(Self {
            pins: drivers,
            owned,
        })
    }
}

impl GpioBank for EspGpioBank {
    fn write(&mut self, pin_mask: u64, value_mask: u64) {
        let pin_mask = pin_mask & self.owned;
        let (set, clear) = set_clear_masks(pin_mask & LOW_BANK, value_mask);
        // SAFETY: 只写本组已配置为输出的引脚位，W1TS/W1TC 写 0 的位不受影响
        unsafe {
            if set != 0 {
                core::ptr::write_volatile(GPIO_OUT_W1TS_REG as usize as *mut u32, set as u32);
            }
            if clear != 0 {
                core::ptr::write_volatile(GPIO_OUT_W1TC_REG as usize as *mut u32, clear as u32);
            }
        }

        // GPIO32 及以上不在同一寄存器，逐个写
        let high = pin_mask & !LOW_BANK;
        if high == 0 {
            return;
        }
        for (number, driver) in self.pins.iter_mut() {
            let bit = 1u64 << *number;
            if high & bit == 0 {
                continue;
            }
            let level = if value_mask & bit != 0 {
                Level::High
            } else {
                Level::Low
            };
            if let Err(err) = driver.set_level(level) {
                log::warn!("GPIO{} write failed: {:?}", number, err);
            }
        }
    }

    fn output_levels(&self) -> u64 {
        self.pins
            .iter()
            .filter(|(_, driver)| driver.is_set_high())
            .fold(0, |acc, (number, _)| acc | (1u64 << *number))
    }
}
