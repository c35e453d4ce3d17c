use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::device::DeviceEvent;
use crate::error::DeviceError;
use crate::server::{ConnectionId, SocketEvent};

const LISTENER_STACK_SIZE: usize = 8192;
const READER_STACK_SIZE: usize = 8192;
const RX_BUFFER_SIZE: usize = 512;

/// 绑定监听端口并启动接收线程。
///
/// 绑定失败直接返回，由调用方记录后在无 TCP 服务的状态下继续运行。
pub fn spawn_listener(
    config: &ServerConfig,
    event_tx: Sender<DeviceEvent>,
) -> Result<thread::JoinHandle<()>, DeviceError> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))?;
    log::info!("TCP Server accepts connections on port {}", config.port);
    spawn_accept_loop(listener, config.idle_timeout, event_tx)
}

/// 在已绑定的监听 socket 上循环 accept，每个连接分配递增编号。
pub fn spawn_accept_loop(
    listener: TcpListener,
    idle_timeout: Duration,
    event_tx: Sender<DeviceEvent>,
) -> Result<thread::JoinHandle<()>, DeviceError> {
    let handle = thread::Builder::new()
        .name("tcp-accept".into())
        .stack_size(LISTENER_STACK_SIZE)
        .spawn(move || {
            let mut next_id: u32 = 0;
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        log::warn!("TCP accept failed: {:?}", err);
                        continue;
                    }
                };
                next_id = next_id.wrapping_add(1);
                let id = ConnectionId(next_id);
                if let Err(err) = accept_stream(id, stream, idle_timeout, &event_tx) {
                    log::warn!("TCP connection #{} setup failed: {:?}", id.0, err);
                }
            }
        })?;
    Ok(handle)
}

fn accept_stream(
    id: ConnectionId,
    stream: TcpStream,
    idle_timeout: Duration,
    event_tx: &Sender<DeviceEvent>,
) -> std::io::Result<()> {
    let peer = stream.peer_addr()?;
    stream.set_read_timeout(Some(idle_timeout))?;
    // accept 必须先于该连接的任何数据/断开事件入队
    let _ = event_tx.send(DeviceEvent::Socket(SocketEvent::Accepted { id, peer }));
    let reader_tx = event_tx.clone();
    let spawned = thread::Builder::new()
        .name(format!("tcp-conn-{}", id.0))
        .stack_size(READER_STACK_SIZE)
        .spawn(move || read_stream(id, stream, reader_tx));
    if let Err(err) = spawned {
        let _ = event_tx.send(DeviceEvent::Socket(SocketEvent::Disconnected { id }));
        return Err(err);
    }
    Ok(())
}

/// 连接读循环：把读到的字节、断开与错误转成事件。
fn read_stream(id: ConnectionId, mut stream: TcpStream, event_tx: Sender<DeviceEvent>) {
    let mut buf = [0u8; RX_BUFFER_SIZE];
    loop {
        let event = match stream.read(&mut buf) {
            Ok(0) => SocketEvent::Disconnected { id },
            Ok(count) => SocketEvent::Received {
                id,
                data: buf[..count].to_vec(),
            },
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                log::info!("TCP connection #{} idle timeout", id.0);
                let _ = stream.shutdown(Shutdown::Both);
                SocketEvent::Disconnected { id }
            }
            Err(err) => SocketEvent::ReconnectError {
                id,
                code: err.raw_os_error().unwrap_or(-1),
            },
        };
        let finished = !matches!(event, SocketEvent::Received { .. });
        if event_tx.send(DeviceEvent::Socket(event)).is_err() || finished {
            break;
        }
    }
}
