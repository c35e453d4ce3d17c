//! 设备核心状态。
//!
//! 所有可变状态（连接状态、连接计数、节拍计数、LED 输出）集中在 [`Device`]
//! 中，由唯一的事件分发循环以 `&mut` 方式逐个处理事件。定时器与 socket
//! 回调只负责投递 [`DeviceEvent`]，绝不能直接或重入地调用 `dispatch`。

use crate::config::DeviceConfig;
use crate::digit::CommandMask;
use crate::error::ConfigError;
use crate::led::{GpioBank, LedPort};
use crate::scheduler::{StatusScheduler, TickReport};
use crate::server::{DigitServer, SocketEvent};
use crate::tracker::{ConnectionState, ConnectionTracker};

/// 查询已关联到 AP 的 WiFi 站点数量。
pub trait SessionSource {
    fn session_count(&self) -> u8;
}

/// 投递给分发循环的事件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    Tick,
    Socket(SocketEvent),
}

pub struct Device<G, S> {
    leds: LedPort<G>,
    sessions: S,
    tracker: ConnectionTracker,
    scheduler: StatusScheduler,
    server: DigitServer,
}

impl<G: GpioBank, S: SessionSource> Device<G, S> {
    /// 校验配置并熄灭所有 LED。
    pub fn new(config: &DeviceConfig, gpio: G, sessions: S) -> Result<Self, ConfigError> {
        config.schedule.validate()?;
        config.leds.validate()?;
        let mut leds = LedPort::new(gpio, config.leds);
        leds.init();
        Ok(Self {
            leds,
            sessions,
            tracker: ConnectionTracker::new(),
            scheduler: StatusScheduler::new(&config.schedule),
            server: DigitServer::new(),
        })
    }

    pub fn dispatch(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Tick => {
                self.on_tick();
            }
            DeviceEvent::Socket(event) => {
                self.on_socket(event);
            }
        }
    }

    pub fn on_tick(&mut self) -> TickReport {
        let sessions = &self.sessions;
        self.scheduler
            .on_tick_with(|| sessions.session_count(), &mut self.tracker, &mut self.leds)
    }

    pub fn on_socket(&mut self, event: SocketEvent) -> Option<CommandMask> {
        self.server.handle(event, &mut self.tracker, &mut self.leds)
    }

    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    pub fn open_connections(&self) -> i32 {
        self.tracker.open_connections()
    }

    pub fn command_mask(&self) -> CommandMask {
        self.leds.command_mask()
    }

    pub fn status_led_on(&self) -> bool {
        self.leds.status_led_on()
    }

    pub fn leds(&self) -> &LedPort<G> {
        &self.leds
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn scheduler(&self) -> &StatusScheduler {
        &self.scheduler
    }
}
