use std::sync::mpsc::{self, Receiver, Sender};

use crate::device::{Device, DeviceEvent, SessionSource};
use crate::led::GpioBank;

/// 事件通道：定时器与 TCP 线程投递，分发循环独占消费。
pub struct DeviceChannels {
    pub event_tx: Sender<DeviceEvent>,
    pub event_rx: Receiver<DeviceEvent>,
}

impl DeviceChannels {
    /// 创建默认的 mpsc 通道。
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self { event_tx, event_rx }
    }
}

impl Default for DeviceChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// 分发循环：逐个处理事件直至所有发送端关闭，返回处理的事件数。
///
/// 事件按到达顺序串行执行，处理函数之间不会交叠。
pub fn run_event_loop<G, S>(device: &mut Device<G, S>, event_rx: Receiver<DeviceEvent>) -> usize
where
    G: GpioBank,
    S: SessionSource,
{
    let mut handled = 0;
    // 阻塞等待事件
    while let Ok(event) = event_rx.recv() {
        device.dispatch(event);
        handled += 1;
    }
    handled
}
