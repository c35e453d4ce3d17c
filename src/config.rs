use std::net::Ipv4Addr;
use std::time::Duration;

use crate::error::ConfigError;

// 接入点默认参数（可通过 .env 在编译期覆盖）。
pub const DEFAULT_AP_SSID: &str = "ESP8266_AP_LED";
pub const DEFAULT_AP_PASS: &str = "ap_test5";
pub const DEFAULT_AP_CHANNEL: u8 = 10;
pub const DEFAULT_MAX_CLIENTS: u8 = 3;
pub const DEFAULT_SERVER_PORT: u16 = 1010;

// 1 tick = 100ms。
pub const TICK_PERIOD_MS: u64 = 100;
pub const TICKS_PER_STATE_UPDATE: u32 = 50;
pub const TICKS_PER_STATUS_LED: u32 = 5;
pub const TICK_WRAP: u32 = 1_000_000;

// ESP32 可用作输出的最大 GPIO 编号。
const MAX_OUTPUT_GPIO: u8 = 39;

/// 软 AP 参数。
#[derive(Clone, Debug)]
pub struct AccessPointConfig {
    pub ssid: String,
    pub passphrase: String,
    pub max_clients: u8,
    pub channel: u8,
    pub ssid_hidden: bool,
}

/// AP 主机地址与 DHCP 分配范围。
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub host_ip: Ipv4Addr,
    pub prefix_len: u8,
    pub lease_start: Ipv4Addr,
    pub lease_end: Ipv4Addr,
}

/// TCP 数字指令服务参数。
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub idle_timeout: Duration,
}

/// 定时器节拍与子调度周期。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub tick_period: Duration,
    pub state_update_every: u32,
    pub status_led_every: u32,
    pub wrap_at: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(TICK_PERIOD_MS),
            state_update_every: TICKS_PER_STATE_UPDATE,
            status_led_every: TICKS_PER_STATUS_LED,
            wrap_at: TICK_WRAP,
        }
    }
}

impl ScheduleConfig {
    /// 回绕边界必须是两个周期的整数倍，否则回绕时会漏触发或重复触发。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_update_every == 0 {
            return Err(ConfigError::ZeroInterval("state_update_every"));
        }
        if self.status_led_every == 0 {
            return Err(ConfigError::ZeroInterval("status_led_every"));
        }
        if self.wrap_at == 0 {
            return Err(ConfigError::ZeroInterval("wrap_at"));
        }
        for interval in [self.state_update_every, self.status_led_every] {
            if self.wrap_at % interval != 0 {
                return Err(ConfigError::WrapNotDivisible {
                    interval,
                    wrap_at: self.wrap_at,
                });
            }
        }
        Ok(())
    }
}

/// LED 引脚分配。`command[i]` 对应指令掩码的第 i 位。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedPins {
    pub command: [u8; 3],
    pub status: u8,
    /// 低电平点亮。
    pub active_low: bool,
}

impl Default for LedPins {
    fn default() -> Self {
        Self {
            command: [12, 13, 14],
            status: 2,
            active_low: true,
        }
    }
}

impl LedPins {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.command[0], self.command[1], self.command[2], self.status];
        for (idx, &pin) in all.iter().enumerate() {
            if pin > MAX_OUTPUT_GPIO {
                return Err(ConfigError::PinOutOfRange(pin));
            }
            if all[..idx].contains(&pin) {
                return Err(ConfigError::DuplicatePin(pin));
            }
        }
        Ok(())
    }
}

/// 设备完整配置。
#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub access_point: AccessPointConfig,
    pub network: NetworkConfig,
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub leds: LedPins,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            access_point: AccessPointConfig {
                ssid: DEFAULT_AP_SSID.to_string(),
                passphrase: DEFAULT_AP_PASS.to_string(),
                max_clients: DEFAULT_MAX_CLIENTS,
                channel: DEFAULT_AP_CHANNEL,
                ssid_hidden: false,
            },
            network: NetworkConfig {
                host_ip: Ipv4Addr::new(10, 0, 0, 1),
                prefix_len: 24,
                lease_start: Ipv4Addr::new(10, 0, 0, 100),
                lease_end: Ipv4Addr::new(10, 0, 0, 110),
            },
            server: ServerConfig {
                port: DEFAULT_SERVER_PORT,
                idle_timeout: Duration::from_secs(60),
            },
            schedule: ScheduleConfig::default(),
            leds: LedPins::default(),
        }
    }
}

impl DeviceConfig {
    /// 默认配置叠加编译期 .env 覆盖项（解析失败则保留默认值）。
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ssid) = option_env!("AP_SSID") {
            config.access_point.ssid = ssid.to_string();
        }
        if let Some(pass) = option_env!("AP_PASS") {
            config.access_point.passphrase = pass.to_string();
        }
        if let Some(channel) = option_env!("AP_CHANNEL").and_then(|v| v.parse::<u8>().ok()) {
            config.access_point.channel = channel;
        }
        if let Some(port) = option_env!("LED_SERVER_PORT").and_then(|v| v.parse::<u16>().ok()) {
            config.server.port = port;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ap = &self.access_point;
        if ap.ssid.is_empty() || ap.ssid.len() > 32 {
            return Err(ConfigError::InvalidSsid(ap.ssid.len()));
        }
        let pass_len = ap.passphrase.len();
        if pass_len != 0 && !(8..=63).contains(&pass_len) {
            return Err(ConfigError::InvalidPassphrase(pass_len));
        }
        if !(1..=10).contains(&ap.max_clients) {
            return Err(ConfigError::MaxClients(ap.max_clients));
        }
        if !(1..=13).contains(&ap.channel) {
            return Err(ConfigError::Channel(ap.channel));
        }
        self.network.validate()?;
        self.schedule.validate()?;
        self.leds.validate()
    }
}

impl NetworkConfig {
    pub fn netmask(&self) -> Ipv4Addr {
        let bits = match self.prefix_len {
            0 => 0,
            len => u32::MAX << (32 - u32::from(len.min(32))),
        };
        Ipv4Addr::from(bits)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix_len == 0 || self.prefix_len > 30 {
            return Err(ConfigError::DhcpRange);
        }
        let mask = u32::from(self.netmask());
        let subnet = u32::from(self.host_ip) & mask;
        let start = u32::from(self.lease_start);
        let end = u32::from(self.lease_end);
        let host = u32::from(self.host_ip);
        let in_subnet = |addr: u32| addr & mask == subnet;
        if !in_subnet(start) || !in_subnet(end) || start > end {
            return Err(ConfigError::DhcpRange);
        }
        if (start..=end).contains(&host) {
            return Err(ConfigError::DhcpRange);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DeviceConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.server.port, 1010);
        assert_eq!(config.network.netmask(), Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn wrap_must_divide_by_both_intervals() {
        let schedule = ScheduleConfig {
            state_update_every: 30,
            ..ScheduleConfig::default()
        };
        // 1_000_000 % 30 != 0
        assert_eq!(
            schedule.validate(),
            Err(ConfigError::WrapNotDivisible {
                interval: 30,
                wrap_at: TICK_WRAP
            })
        );
    }

    #[test]
    fn zero_interval_rejected() {
        let schedule = ScheduleConfig {
            status_led_every: 0,
            ..ScheduleConfig::default()
        };
        assert_eq!(
            schedule.validate(),
            Err(ConfigError::ZeroInterval("status_led_every"))
        );
    }

    #[test]
    fn short_passphrase_rejected_but_open_network_allowed() {
        let mut config = DeviceConfig::default();
        config.access_point.passphrase = "short".to_string();
        assert_eq!(config.validate(), Err(ConfigError::InvalidPassphrase(5)));
        config.access_point.passphrase.clear();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn duplicate_led_pin_rejected() {
        let mut config = DeviceConfig::default();
        config.leds.status = 13;
        assert_eq!(config.validate(), Err(ConfigError::DuplicatePin(13)));
    }

    #[test]
    fn lease_range_must_stay_in_subnet_and_skip_host() {
        let mut config = DeviceConfig::default();
        config.network.lease_end = Ipv4Addr::new(10, 0, 1, 5);
        assert_eq!(config.validate(), Err(ConfigError::DhcpRange));

        let mut config = DeviceConfig::default();
        config.network.lease_start = Ipv4Addr::new(10, 0, 0, 1);
        assert_eq!(config.validate(), Err(ConfigError::DhcpRange));
    }

    #[test]
    fn partition_table_is_contiguous_and_fills_flash() {
        const FLASH_SIZE: u32 = 0x40_0000;
        let parse = |field: &str| u32::from_str_radix(field.trim().trim_start_matches("0x"), 16);

        let mut entries = Vec::new();
        for line in include_str!("../partitions.csv").lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            let offset = parse(fields[3]).unwrap();
            let size = parse(fields[4]).unwrap();
            entries.push((fields[0].trim(), offset, size));
        }

        let names: Vec<&str> = entries.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names, ["nvs", "phy_init", "factory"]);
        for pair in entries.windows(2) {
            assert_eq!(pair[0].1 + pair[0].2, pair[1].1);
        }
        let (_, offset, size) = entries[entries.len() - 1];
        assert_eq!(offset + size, FLASH_SIZE);
    }
}
