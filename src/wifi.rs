use core::convert::TryInto;
use core::ffi::c_void;

use embedded_svc::wifi::{AccessPointConfiguration, AuthMethod, Configuration};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::sys::{
    dhcps_lease_t, esp, esp_ip4_addr_t, esp_netif_dhcp_option_id_t_ESP_NETIF_REQUESTED_IP_ADDRESS,
    esp_netif_dhcp_option_mode_t_ESP_NETIF_OP_SET, esp_netif_dhcps_option, esp_netif_dhcps_start,
    esp_netif_dhcps_stop, esp_wifi_ap_get_sta_list, wifi_sta_list_t, EspError,
};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::ipv4::{self, Mask, RouterConfiguration, Subnet};
use esp_idf_svc::netif::{EspNetif, NetifConfiguration, NetifStack};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiDriver};
use std::net::Ipv4Addr;

use crate::config::{AccessPointConfig, NetworkConfig};
use crate::device::SessionSource;
use crate::error::{ConfigError, DeviceError};

/// 启动软 AP：主机地址 + DHCP 分配范围 + 认证参数。
///
/// 失败时 WiFi 驱动随返回值一起释放。DHCP 范围设置失败只记录日志。
pub fn start_access_point(
    modem: Modem,
    ap: &AccessPointConfig,
    network: &NetworkConfig,
) -> Result<BlockingWifi<EspWifi<'static>>, DeviceError> {
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let mut ap_netif_conf = NetifConfiguration::wifi_default_router();
    ap_netif_conf.ip_configuration = Some(ipv4::Configuration::Router(RouterConfiguration {
        subnet: Subnet {
            gateway: network.host_ip,
            mask: Mask(network.prefix_len),
        },
        dhcp_enabled: true,
        dns: None,
        secondary_dns: None,
    }));

    let driver = WifiDriver::new(modem, sys_loop.clone(), nvs)?;
    let esp_wifi = EspWifi::wrap_all(
        driver,
        EspNetif::new(NetifStack::Sta)?,
        EspNetif::new_with_conf(&ap_netif_conf)?,
    )?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

    let auth_method = if ap.passphrase.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };
    let wifi_configuration = Configuration::AccessPoint(AccessPointConfiguration {
        ssid: ap
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| ConfigError::InvalidSsid(ap.ssid.len()))?,
        ssid_hidden: ap.ssid_hidden,
        auth_method,
        password: ap
            .passphrase
            .as_str()
            .try_into()
            .map_err(|_| ConfigError::InvalidPassphrase(ap.passphrase.len()))?,
        channel: ap.channel,
        max_connections: u16::from(ap.max_clients),
        ..Default::default()
    });

    if let Err(err) = wifi.set_configuration(&wifi_configuration) {
        log::error!("Unable to set Access Point configuration: {:?}", err);
        return Err(err.into());
    }
    log::info!("AP config is set (ssid {}, channel {})", ap.ssid, ap.channel);

    wifi.start()?;
    wifi.wait_netif_up()?;

    match set_dhcp_lease(wifi.wifi().ap_netif(), network.lease_start, network.lease_end) {
        Ok(()) => log::info!(
            "AP DHCP Started ({} - {})",
            network.lease_start,
            network.lease_end
        ),
        Err(err) => log::error!("Unable to start AP DHCP: {:?}", err),
    }

    match wifi.wifi().ap_netif().get_ip_info() {
        Ok(info) => log::info!("AP Host IP: {}", info.ip),
        Err(err) => log::warn!("AP host IP unavailable: {:?}", err),
    }
    log::info!("ESP Access Point initialization is completed");
    Ok(wifi)
}

/// DHCP 服务需先停止才能修改租约范围。
fn set_dhcp_lease(netif: &EspNetif, start: Ipv4Addr, end: Ipv4Addr) -> Result<(), EspError> {
    let handle = netif.handle();
    // 已停止时返回错误码，忽略即可
    let _ = unsafe { esp_netif_dhcps_stop(handle) };

    let mut lease = dhcps_lease_t {
        enable: true,
        start_ip: esp_ip4_addr_t {
            addr: u32::from_le_bytes(start.octets()),
        },
        end_ip: esp_ip4_addr_t {
            addr: u32::from_le_bytes(end.octets()),
        },
    };
    esp!(unsafe {
        esp_netif_dhcps_option(
            handle,
            esp_netif_dhcp_option_mode_t_ESP_NETIF_OP_SET,
            esp_netif_dhcp_option_id_t_ESP_NETIF_REQUESTED_IP_ADDRESS,
            &mut lease as *mut dhcps_lease_t as *mut c_void,
            core::mem::size_of::<dhcps_lease_t>() as u32,
        )
    })?;
    esp!(unsafe { esp_netif_dhcps_start(handle) })
}

/// 通过 ESP-IDF 查询当前关联的站点数。
///
/// 调用方需保证 AP 驱动在其生命周期内保持运行。
pub struct ApSessions;

impl SessionSource for ApSessions {
    fn session_count(&self) -> u8 {
        let mut list = wifi_sta_list_t::default();
        match esp!(unsafe { esp_wifi_ap_get_sta_list(&mut list) }) {
            Ok(()) => list.num.clamp(0, u8::MAX as i32) as u8,
            Err(err) => {
                log::warn!("WiFi station list query failed: {:?}", err);
                0
            }
        }
    }
}
