use crate::config::ScheduleConfig;
use crate::led::{GpioBank, LedPort};
use crate::tracker::{ConnectionState, ConnectionTracker};

/// 定时器节拍计数，到达回绕边界后归零。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickCounter {
    value: u32,
    wrap_at: u32,
}

impl TickCounter {
    pub fn new(wrap_at: u32) -> Self {
        Self::starting_at(0, wrap_at)
    }

    pub fn starting_at(value: u32, wrap_at: u32) -> Self {
        Self {
            value: value % wrap_at.max(1),
            wrap_at: wrap_at.max(1),
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_multiple_of(&self, every: u32) -> bool {
        self.value % every == 0
    }

    pub fn advance(&mut self) {
        self.value += 1;
        if self.value >= self.wrap_at {
            self.value = 0;
        }
    }
}

/// 单次节拍中触发了哪些子调度。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub state_updated: bool,
    pub status_led_updated: bool,
}

/// 状态调度器：每 N 拍刷新连接状态，每 M 拍刷新状态 LED。
#[derive(Debug)]
pub struct StatusScheduler {
    ticks: TickCounter,
    state_update_every: u32,
    status_led_every: u32,
}

impl StatusScheduler {
    /// `schedule` 需已通过 [`ScheduleConfig::validate`]。
    pub fn new(schedule: &ScheduleConfig) -> Self {
        Self::with_counter(schedule, TickCounter::new(schedule.wrap_at))
    }

    pub fn with_counter(schedule: &ScheduleConfig, ticks: TickCounter) -> Self {
        Self {
            ticks,
            state_update_every: schedule.state_update_every.max(1),
            status_led_every: schedule.status_led_every.max(1),
        }
    }

    pub fn ticks(&self) -> TickCounter {
        self.ticks
    }

    pub fn on_tick<G: GpioBank>(
        &mut self,
        sessions: u8,
        tracker: &mut ConnectionTracker,
        leds: &mut LedPort<G>,
    ) -> TickReport {
        self.on_tick_with(|| sessions, tracker, leds)
    }

    /// 与 [`on_tick`](Self::on_tick) 相同，但仅在状态更新节拍时才查询会话数。
    pub fn on_tick_with<G, F>(
        &mut self,
        query_sessions: F,
        tracker: &mut ConnectionTracker,
        leds: &mut LedPort<G>,
    ) -> TickReport
    where
        G: GpioBank,
        F: FnOnce() -> u8,
    {
        let mut report = TickReport::default();

        if self.ticks.is_multiple_of(self.state_update_every) {
            tracker.refresh(query_sessions());
            report.state_updated = true;
        }

        if self.ticks.is_multiple_of(self.status_led_every) {
            match tracker.state() {
                ConnectionState::SocketConnected => leds.set_status_led(true),
                ConnectionState::WifiConnected => leds.toggle_status_led(),
                ConnectionState::Disconnected => leds.set_status_led(false),
            }
            report.status_led_updated = true;
        }

        self.ticks.advance();
        report
    }
}
