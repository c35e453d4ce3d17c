use crate::config::LedPins;
use crate::digit::CommandMask;

/// GPIO 输出寄存器抽象（按 GPIO 编号的位掩码）。
pub trait GpioBank {
    /// 一次性写入 `pin_mask` 覆盖的所有引脚，电平取 `value_mask` 对应位。
    fn write(&mut self, pin_mask: u64, value_mask: u64);

    /// 当前输出电平（高电平位为 1）。
    fn output_levels(&self) -> u64;
}

/// 把 (引脚掩码, 电平掩码) 拆成置位/清零两个寄存器值。
pub fn set_clear_masks(pin_mask: u64, value_mask: u64) -> (u64, u64) {
    (pin_mask & value_mask, pin_mask & !value_mask)
}

fn pin_bit(pin: u8) -> u64 {
    1u64 << pin
}

/// 三路指令 LED + 一路状态 LED。
pub struct LedPort<G> {
    gpio: G,
    pins: LedPins,
    command_mask: CommandMask,
}

impl<G: GpioBank> LedPort<G> {
    pub fn new(gpio: G, pins: LedPins) -> Self {
        Self {
            gpio,
            pins,
            command_mask: CommandMask::ALL_OFF,
        }
    }

    /// 上电初始化：所有 LED 熄灭。
    pub fn init(&mut self) {
        self.set_command_leds(CommandMask::ALL_OFF);
        self.set_status_led(false);
    }

    pub fn command_pin_mask(&self) -> u64 {
        self.pins.command.iter().fold(0, |acc, &pin| acc | pin_bit(pin))
    }

    /// 整体覆盖三路指令 LED（单次批量写入）。
    pub fn set_command_leds(&mut self, mask: CommandMask) {
        let mut value = 0u64;
        for (led, &pin) in self.pins.command.iter().enumerate() {
            if self.level_for(mask.is_on(led)) {
                value |= pin_bit(pin);
            }
        }
        self.gpio.write(self.command_pin_mask(), value);
        self.command_mask = mask;
    }

    pub fn set_status_led(&mut self, on: bool) {
        let bit = pin_bit(self.pins.status);
        let value = if self.level_for(on) { bit } else { 0 };
        self.gpio.write(bit, value);
    }

    /// 按硬件输出寄存器判断状态 LED 是否点亮。
    pub fn status_led_on(&self) -> bool {
        let high = self.gpio.output_levels() & pin_bit(self.pins.status) != 0;
        high != self.pins.active_low
    }

    pub fn toggle_status_led(&mut self) {
        let on = self.status_led_on();
        self.set_status_led(!on);
    }

    /// 最近一次写入的指令掩码。
    pub fn command_mask(&self) -> CommandMask {
        self.command_mask
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    fn level_for(&self, on: bool) -> bool {
        on != self.pins.active_low
    }
}
