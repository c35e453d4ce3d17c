use std::sync::mpsc::Sender;
use std::time::Duration;

use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};

use crate::device::DeviceEvent;
use crate::error::DeviceError;

/// 启动周期定时器，每个周期投递一次 `DeviceEvent::Tick`。
///
/// 返回的定时器被丢弃时停止，调用方需在整个运行期内持有它。
pub fn arm_periodic_tick(
    period: Duration,
    event_tx: Sender<DeviceEvent>,
) -> Result<EspTimer<'static>, DeviceError> {
    let service = EspTaskTimerService::new()?;
    let timer = service.timer(move || {
        // 分发循环退出后忽略
        let _ = event_tx.send(DeviceEvent::Tick);
    })?;
    timer.every(period)?;
    log::info!("Status timer armed ({} ms)", period.as_millis());
    Ok(timer)
}
