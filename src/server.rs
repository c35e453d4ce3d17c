use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::SocketAddr;

use crate::digit::{decode, scan_trailing_command, CommandMask};
use crate::led::{GpioBank, LedPort};
use crate::tracker::ConnectionTracker;

/// 已接受连接的编号（由监听线程分配）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

/// 平台侧 TCP 回调事件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    Accepted { id: ConnectionId, peer: SocketAddr },
    Received { id: ConnectionId, data: Vec<u8> },
    Disconnected { id: ConnectionId },
    ReconnectError { id: ConnectionId, code: i32 },
}

/// TCP 数字指令服务：维护连接计数并把尾部数字转为 LED 掩码。
#[derive(Debug, Default)]
pub struct DigitServer {
    peers: HashMap<ConnectionId, SocketAddr>,
}

impl DigitServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前仍记录在案的连接数，只出现在连接日志里，计数以 tracker 为准。
    pub fn known_peers(&self) -> usize {
        self.peers.len()
    }

    /// 处理一次 socket 事件，若执行了数字指令则返回新的掩码。
    pub fn handle<G: GpioBank>(
        &mut self,
        event: SocketEvent,
        tracker: &mut ConnectionTracker,
        leds: &mut LedPort<G>,
    ) -> Option<CommandMask> {
        match event {
            SocketEvent::Accepted { id, peer } => {
                self.peers.insert(id, peer);
                log::info!(
                    "TCP Server 'on client connection accepted' event from {} ({} open)",
                    peer,
                    self.known_peers()
                );
                tracker.on_socket_accepted();
                None
            }
            SocketEvent::Received { id, data } => {
                log::info!(
                    "TCP Server 'on data received' event. Received {} bytes.",
                    data.len()
                );
                log_packet(id, &data);
                let mut applied = None;
                scan_trailing_command(&data, |digit| {
                    let mask = decode(digit);
                    log::info!("Processing digit-key: {}", mask.bits());
                    leds.set_command_leds(mask);
                    applied = Some(mask);
                });
                applied
            }
            SocketEvent::Disconnected { id } => {
                match self.peers.remove(&id) {
                    Some(peer) => log::info!(
                        "TCP Server {} 'on disconnect' event ({} open)",
                        peer,
                        self.known_peers()
                    ),
                    None => log::info!("TCP Server #{} 'on disconnect' event", id.0),
                }
                tracker.on_socket_closed();
                None
            }
            SocketEvent::ReconnectError { id, code } => {
                // 仅记录，计数漂移由会话清零规则修复
                match self.peers.remove(&id) {
                    Some(peer) => {
                        log::warn!("TCP Server {} err {} 'on reconnect' event", peer, code)
                    }
                    None => log::warn!("TCP Server #{} err {} 'on reconnect' event", id.0, code),
                }
                None
            }
        }
    }
}

/// 调试日志：打印收到的数据包内容。
fn log_packet(id: ConnectionId, bytes: &[u8]) {
    if bytes.is_empty() || !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let mut line = String::with_capacity(bytes.len() * 3 + 16);
    let _ = write!(line, "#{} RX:", id.0);
    for byte in bytes {
        let _ = write!(line, " {:02X}", byte);
    }
    log::debug!("{} ({})", line, String::from_utf8_lossy(bytes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedPins;
    use crate::test_support::FakeGpio;
    use crate::tracker::ConnectionState;

    struct Harness {
        server: DigitServer,
        tracker: ConnectionTracker,
        leds: LedPort<FakeGpio>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                server: DigitServer::new(),
                tracker: ConnectionTracker::new(),
                leds: LedPort::new(FakeGpio::default(), LedPins::default()),
            }
        }

        fn send(&mut self, event: SocketEvent) -> Option<CommandMask> {
            self.server.handle(event, &mut self.tracker, &mut self.leds)
        }

        fn receive(&mut self, data: &[u8]) -> Option<CommandMask> {
            self.send(SocketEvent::Received {
                id: ConnectionId(1),
                data: data.to_vec(),
            })
        }
    }

    fn peer() -> SocketAddr {
        "10.0.0.100:50123".parse().unwrap()
    }

    #[test]
    fn accept_and_disconnect_adjust_open_count() {
        let mut h = Harness::new();
        h.send(SocketEvent::Accepted {
            id: ConnectionId(1),
            peer: peer(),
        });
        assert_eq!(h.tracker.open_connections(), 1);
        assert_eq!(h.server.known_peers(), 1);
        // 状态要等到下一次刷新才变化
        assert_eq!(h.tracker.state(), ConnectionState::Disconnected);

        h.send(SocketEvent::Disconnected { id: ConnectionId(1) });
        assert_eq!(h.tracker.open_connections(), 0);
        assert_eq!(h.server.known_peers(), 0);
    }

    #[test]
    fn duplicate_disconnect_goes_negative() {
        let mut h = Harness::new();
        h.send(SocketEvent::Disconnected { id: ConnectionId(7) });
        h.send(SocketEvent::Disconnected { id: ConnectionId(7) });
        assert_eq!(h.tracker.open_connections(), -2);
    }

    #[test]
    fn reconnect_error_only_logs() {
        let mut h = Harness::new();
        h.send(SocketEvent::Accepted {
            id: ConnectionId(3),
            peer: peer(),
        });
        let result = h.send(SocketEvent::ReconnectError {
            id: ConnectionId(3),
            code: 104,
        });
        assert_eq!(result, None);
        assert_eq!(h.tracker.open_connections(), 1);
        assert_eq!(h.leds.gpio().writes, 0);
    }

    #[test]
    fn trailing_digit_drives_command_leds() {
        let mut h = Harness::new();
        assert_eq!(h.receive(b"hello7"), Some(CommandMask::ALL_ON));
        assert_eq!(h.leds.command_mask(), CommandMask::ALL_ON);
        // 低电平点亮：三个引脚全为 0
        assert_eq!(h.leds.gpio().levels & (0b111 << 12), 0);
    }

    #[test]
    fn non_command_packets_leave_leds_untouched() {
        let mut h = Harness::new();
        h.receive(b"5");
        let writes = h.leds.gpio().writes;
        assert_eq!(h.receive(b"57x"), None);
        assert_eq!(h.receive(b"9"), None);
        assert_eq!(h.receive(b""), None);
        assert_eq!(h.leds.gpio().writes, writes);
        assert_eq!(h.leds.command_mask().bits(), 5);
    }

    #[test]
    fn each_packet_applies_at_most_one_digit() {
        let mut h = Harness::new();
        assert_eq!(h.receive(b"123"), Some(CommandMask::from_bits(3)));
        assert_eq!(h.leds.gpio().writes, 1);
        assert_eq!(h.receive(b"5x7"), Some(CommandMask::from_bits(7)));
        assert_eq!(h.leds.gpio().writes, 2);
    }
}
