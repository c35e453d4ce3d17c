/// 客户端连接状态，用于状态 LED 指示：
/// 灭 - 无 WiFi 会话；闪烁 - 有 WiFi 会话但无 socket；常亮 - 有 socket 连接。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    WifiConnected,
    SocketConnected,
}

/// 连接跟踪器：状态仅在状态更新节拍时重新计算，socket 事件只改计数。
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    open_connections: i32,
    last_sessions: u8,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 当前 TCP 连接计数。重复断开通知可能让它暂时为负。
    pub fn open_connections(&self) -> i32 {
        self.open_connections
    }

    /// 上一次状态更新时的 WiFi 会话数，用于判断是否需要打印会话日志。
    pub fn last_sessions(&self) -> u8 {
        self.last_sessions
    }

    pub fn on_socket_accepted(&mut self) {
        self.open_connections = self.open_connections.saturating_add(1);
    }

    pub fn on_socket_closed(&mut self) {
        self.open_connections = self.open_connections.saturating_sub(1);
    }

    /// 根据 WiFi 会话数重新推导状态。会话数为 0 时强制清零连接计数。
    pub fn refresh(&mut self, sessions: u8) -> ConnectionState {
        if sessions != self.last_sessions {
            log::info!("Number of connected WiFi sessions: {}", sessions);
            self.last_sessions = sessions;
        }

        let next = if sessions == 0 {
            self.open_connections = 0;
            ConnectionState::Disconnected
        } else if self.open_connections > 0 {
            ConnectionState::SocketConnected
        } else {
            ConnectionState::WifiConnected
        };

        if next != self.state {
            log::info!("Connection state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
        next
    }
}
