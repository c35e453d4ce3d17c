use std::cell::Cell;
use std::net::SocketAddr;

use digit_led_ap::config::DeviceConfig;
use digit_led_ap::device::{Device, DeviceEvent, SessionSource};
use digit_led_ap::led::GpioBank;
use digit_led_ap::server::{ConnectionId, SocketEvent};
use digit_led_ap::tracker::ConnectionState;

const STATE_UPDATE_TICKS: usize = 50;
const COMMAND_PINS: u64 = 0b111 << 12;

#[derive(Default)]
struct RegisterGpio {
    levels: u64,
}

impl GpioBank for RegisterGpio {
    fn write(&mut self, pin_mask: u64, value_mask: u64) {
        self.levels = (self.levels & !pin_mask) | (value_mask & pin_mask);
    }

    fn output_levels(&self) -> u64 {
        self.levels
    }
}

#[derive(Default)]
struct Stations {
    associated: Cell<u8>,
}

impl SessionSource for Stations {
    fn session_count(&self) -> u8 {
        self.associated.get()
    }
}

struct Rig {
    device: Device<RegisterGpio, Stations>,
}

impl Rig {
    fn new() -> Self {
        let device = Device::new(
            &DeviceConfig::default(),
            RegisterGpio::default(),
            Stations::default(),
        )
        .expect("default config is valid");
        Self { device }
    }

    fn set_sessions(&self, count: u8) {
        self.device.sessions().associated.set(count);
    }

    /// 运行一个完整的状态更新周期，并记录每 5 拍的状态灯采样。
    fn run_state_period(&mut self) -> Vec<bool> {
        let mut samples = Vec::new();
        for tick in 0..STATE_UPDATE_TICKS {
            self.device.dispatch(DeviceEvent::Tick);
            if tick % 5 == 0 {
                samples.push(self.device.status_led_on());
            }
        }
        samples
    }

    fn socket(&mut self, event: SocketEvent) {
        self.device.dispatch(DeviceEvent::Socket(event));
    }
}

fn peer() -> SocketAddr {
    "10.0.0.100:49152".parse().unwrap()
}

#[test]
fn client_lifecycle_drives_status_and_command_leds() {
    let mut rig = Rig::new();

    // 无客户端：状态灯熄灭
    let samples = rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::Disconnected);
    assert!(samples.iter().all(|on| !on));

    // WiFi 客户端关联：下一次状态更新后闪烁
    rig.set_sessions(1);
    let samples = rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::WifiConnected);
    assert_eq!(
        samples,
        vec![true, false, true, false, true, false, true, false, true, false]
    );

    // 打开 socket：计数立即变化，状态延迟到下一次更新
    let id = ConnectionId(1);
    rig.socket(SocketEvent::Accepted { id, peer: peer() });
    assert_eq!(rig.device.open_connections(), 1);
    assert_eq!(rig.device.state(), ConnectionState::WifiConnected);
    let samples = rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::SocketConnected);
    assert!(samples.iter().all(|on| *on));

    // 发送指令：三个 LED 全亮（低电平点亮）
    rig.socket(SocketEvent::Received {
        id,
        data: b"hello7".to_vec(),
    });
    assert_eq!(rig.device.command_mask().bits(), 0b111);
    assert_eq!(rig.device.leds().gpio().levels & COMMAND_PINS, 0);

    // 断开 socket：WiFi 会话仍在，回到闪烁
    rig.socket(SocketEvent::Disconnected { id });
    assert_eq!(rig.device.open_connections(), 0);
    rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::WifiConnected);

    // 指令灯保持最后一次的图案
    assert_eq!(rig.device.command_mask().bits(), 0b111);
}

#[test]
fn lost_disconnect_is_healed_when_stations_leave() {
    let mut rig = Rig::new();
    rig.set_sessions(1);

    let id = ConnectionId(9);
    rig.socket(SocketEvent::Accepted { id, peer: peer() });
    // 异常断开只上报错误，不减计数
    rig.socket(SocketEvent::ReconnectError { id, code: 104 });
    rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::SocketConnected);
    assert_eq!(rig.device.open_connections(), 1);

    rig.set_sessions(0);
    rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::Disconnected);
    assert_eq!(rig.device.open_connections(), 0);
    assert!(!rig.device.status_led_on());

    rig.set_sessions(1);
    rig.run_state_period();
    assert_eq!(rig.device.state(), ConnectionState::WifiConnected);
}

#[test]
fn every_digit_maps_to_its_pattern() {
    let mut rig = Rig::new();
    let id = ConnectionId(2);
    for digit in b'0'..=b'7' {
        rig.socket(SocketEvent::Received {
            id,
            data: vec![b'#', digit],
        });
        let expected = digit - b'0';
        assert_eq!(rig.device.command_mask().bits(), expected);
        // 低电平点亮：电平为掩码取反
        let levels = (rig.device.leds().gpio().levels & COMMAND_PINS) >> 12;
        assert_eq!(levels as u8, !expected & 0b111);
    }
}
