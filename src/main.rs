#[cfg(target_os = "espidf")]
fn main() {
    use digit_led_ap::config::DeviceConfig;
    use digit_led_ap::device::Device;
    use digit_led_ap::gpio::EspGpioBank;
    use digit_led_ap::pipeline::{run_event_loop, DeviceChannels};
    use digit_led_ap::wifi::{start_access_point, ApSessions};
    use digit_led_ap::{tcp_link, timer};
    use esp_idf_hal::gpio::OutputPin;
    use esp_idf_hal::prelude::*;

    // ESP-IDF 运行时初始化（链接补丁 & 日志）
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("Digit LED access point booting (ESP-IDF)...");

    let config = DeviceConfig::from_env();
    if let Err(err) = config.validate() {
        log::error!("Invalid device configuration: {}", err);
        return;
    }

    let peripherals = Peripherals::take().unwrap();
    let pins = peripherals.pins;

    // LED 引脚：GPIO12/13/14 指令灯 + GPIO2 状态灯
    let gpio = match EspGpioBank::new([
        pins.gpio12.downgrade_output(),
        pins.gpio13.downgrade_output(),
        pins.gpio14.downgrade_output(),
        pins.gpio2.downgrade_output(),
    ]) {
        Ok(gpio) => gpio,
        Err(err) => {
            log::error!("LED GPIO init failed: {:?}", err);
            return;
        }
    };

    let mut device = match Device::new(&config, gpio, ApSessions) {
        Ok(device) => device,
        Err(err) => {
            log::error!("Device init failed: {}", err);
            return;
        }
    };

    // 接入点失败不阻塞主流程，LED 与定时器照常工作
    let _wifi = match start_access_point(peripherals.modem, &config.access_point, &config.network) {
        Ok(wifi) => Some(wifi),
        Err(err) => {
            log::error!("Access point setup failed: {}", err);
            None
        }
    };

    let DeviceChannels { event_tx, event_rx } = DeviceChannels::new();

    let _listener = match tcp_link::spawn_listener(&config.server, event_tx.clone()) {
        Ok(handle) => Some(handle),
        Err(err) => {
            log::error!("Unable set TCP Server to accept connections: {}", err);
            None
        }
    };

    let _timer = match timer::arm_periodic_tick(config.schedule.tick_period, event_tx) {
        Ok(timer) => timer,
        Err(err) => {
            log::error!("Status timer setup failed: {}", err);
            return;
        }
    };

    // 主线程即分发循环，设备无关机路径
    run_event_loop(&mut device, event_rx);
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("digit-led-ap firmware runs on ESP-IDF targets; host builds only carry the core library and its tests");
}
