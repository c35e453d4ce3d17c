use std::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_hal::sys::EspError;

/// 配置校验错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidSsid(usize),
    InvalidPassphrase(usize),
    MaxClients(u8),
    Channel(u8),
    ZeroInterval(&'static str),
    WrapNotDivisible { interval: u32, wrap_at: u32 },
    PinOutOfRange(u8),
    DuplicatePin(u8),
    DhcpRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSsid(len) => write!(f, "ssid length {} not in 1..=32", len),
            ConfigError::InvalidPassphrase(len) => {
                write!(f, "passphrase length {} must be 0 or 8..=63", len)
            }
            ConfigError::MaxClients(n) => write!(f, "max clients {} not in 1..=10", n),
            ConfigError::Channel(ch) => write!(f, "channel {} not in 1..=13", ch),
            ConfigError::ZeroInterval(name) => write!(f, "{} must be non-zero", name),
            ConfigError::WrapNotDivisible { interval, wrap_at } => write!(
                f,
                "tick wrap {} is not a multiple of interval {}",
                wrap_at, interval
            ),
            ConfigError::PinOutOfRange(pin) => write!(f, "GPIO{} is not an output pin", pin),
            ConfigError::DuplicatePin(pin) => write!(f, "GPIO{} assigned twice", pin),
            ConfigError::DhcpRange => write!(f, "DHCP lease range outside host subnet"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// 设备运行期错误（启动阶段使用，运行后不再向上抛出）。
#[derive(Debug)]
pub enum DeviceError {
    Config(ConfigError),
    Io(std::io::Error),
    #[cfg(target_os = "espidf")]
    Esp(EspError),
}

impl From<ConfigError> for DeviceError {
    fn from(err: ConfigError) -> Self {
        DeviceError::Config(err)
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Io(err)
    }
}

#[cfg(target_os = "espidf")]
impl From<EspError> for DeviceError {
    fn from(err: EspError) -> Self {
        DeviceError::Esp(err)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Config(err) => write!(f, "config: {}", err),
            DeviceError::Io(err) => write!(f, "io: {}", err),
            #[cfg(target_os = "espidf")]
            DeviceError::Esp(err) => write!(f, "esp-idf: {}", err),
        }
    }
}

impl std::error::Error for DeviceError {}
