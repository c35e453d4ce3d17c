//! WiFi 接入点 + TCP 数字指令的 LED 指示设备。
//!
//! 核心模块（数字解码、LED 端口、连接跟踪、状态调度、TCP 指令处理、事件
//! 分发）与平台无关；TCP 线程只依赖 std；ESP-IDF 相关的 WiFi、GPIO 和定时器
//! 只在 `espidf` 目标上编译。

pub mod config;
pub mod device;
pub mod digit;
pub mod error;
pub mod led;
pub mod pipeline;
pub mod scheduler;
pub mod server;
pub mod tcp_link;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(target_os = "espidf")]
pub mod gpio;
#[cfg(target_os = "espidf")]
pub mod timer;
#[cfg(target_os = "espidf")]
pub mod wifi;
