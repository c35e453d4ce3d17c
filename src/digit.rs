/// 可识别的指令字符范围 '0'..='7'。
pub const DIGIT_FIRST: u8 = b'0';
pub const DIGIT_LAST: u8 = b'7';

/// 三路指令 LED 的位掩码，第 i 位置 1 表示第 i 个 LED 点亮。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandMask(u8);

impl CommandMask {
    pub const ALL_OFF: CommandMask = CommandMask(0);
    pub const ALL_ON: CommandMask = CommandMask(0b111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_on(self, led: usize) -> bool {
        led < 3 && self.0 & (1 << led) != 0
    }
}

pub fn is_digit_command(byte: u8) -> bool {
    (DIGIT_FIRST..=DIGIT_LAST).contains(&byte)
}

/// 数字字符 -> 3 位掩码（例如 '7' 全亮，'5' 仅第一和第三个亮）。
///
/// 调用方负责过滤非指令字符。
pub fn decode(digit: u8) -> CommandMask {
    CommandMask::from_bits(digit.wrapping_sub(DIGIT_FIRST) & 0b111)
}

/// 从缓冲区末尾向前扫描指令字符。
///
/// 遇到非指令字符即停止；命中一个指令字符后同样停止，因此每个数据包最多
/// 执行一条指令，且只在最后一个字节是指令字符时生效。返回派发的指令数。
pub fn scan_trailing_command<F>(data: &[u8], mut dispatch: F) -> usize
where
    F: FnMut(u8),
{
    let mut dispatched = 0;
    let mut idx = data.len();
    let mut matched = false;
    while idx > 0 && !matched {
        let byte = data[idx - 1];
        if !is_digit_command(byte) {
            break;
        }
        dispatch(byte);
        dispatched += 1;
        matched = true;
        idx -= 1;
    }
    dispatched
}
