//! 链路状态机模块
//!
//! 跟踪 WiFi 链路（关联 + DHCP 地址）的状态，链路断开时按固定间隔发起重连。
//! 纯逻辑实现，不直接访问硬件，由控制循环每个 tick 调用一次。

use embassy_time::{Duration, Instant};

use crate::config::WIFI_RETRY_INTERVAL;

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 启动后首次连接中
    Connecting,
    /// 已关联且拿到地址
    Online,
    /// 链路丢失，等待重连
    Offline,
}

/// 链路事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// 关联成功且地址可用
    LinkUp,
    /// 链路丢失
    LinkLost,
}

/// 状态转换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// 保持当前状态
    Stay,
    /// 转换到新状态
    Transition(LinkState),
    /// 转换到新状态并重置重试计数
    TransitionWithReset(LinkState),
}

/// 状态机需要控制循环执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// 重新发起 WiFi 连接
    Reconnect,
}

/// 链路监督状态机
#[derive(Debug)]
pub struct LinkSupervisor {
    current_state: LinkState,
    previous_state: Option<LinkState>,
    state_entry_time: Instant,
    next_retry: Option<Instant>,
    retry_count: u32,
    retry_interval: Duration,
}

impl LinkSupervisor {
    /// 创建新的状态机实例
    pub fn new(now: Instant) -> Self {
        Self::with_retry_interval(now, WIFI_RETRY_INTERVAL)
    }

    pub fn with_retry_interval(now: Instant, retry_interval: Duration) -> Self {
        Self {
            current_state: LinkState::Connecting,
            previous_state: None,
            state_entry_time: now,
            // 启动时连接已在进行，首次重试推迟一个间隔
            next_retry: Some(now + retry_interval),
            retry_count: 0,
            retry_interval,
        }
    }

    /// 获取当前状态
    pub fn get_current_state(&self) -> LinkState {
        self.current_state
    }

    /// 获取上一个状态
    pub fn get_previous_state(&self) -> Option<LinkState> {
        self.previous_state
    }

    /// 获取重试次数
    pub fn get_retry_count(&self) -> u32 {
        self.retry_count
    }

    /// 链路是否可用
    pub fn is_up(&self) -> bool {
        self.current_state == LinkState::Online
    }

    /// 进入当前状态的时间
    pub fn state_entry_time(&self) -> Instant {
        self.state_entry_time
    }

    /// 每个 tick 调用：根据实际链路状态产生事件，并在需要时返回重连动作
    pub fn tick(&mut self, now: Instant, connected: bool) -> Option<LinkAction> {
        let event = match (self.current_state, connected) {
            (LinkState::Online, false) => Some(LinkEvent::LinkLost),
            (LinkState::Connecting | LinkState::Offline, true) => Some(LinkEvent::LinkUp),
            _ => None,
        };
        if let Some(event) = event {
            self.handle_event(event, now);
        }

        if self.is_up() {
            return None;
        }

        match self.next_retry {
            Some(due) if now < due => None,
            _ => {
                self.retry_count += 1;
                self.next_retry = Some(now + self.retry_interval);
                crate::log!("[LINK] Reconnect attempt {}", self.retry_count);
                Some(LinkAction::Reconnect)
            }
        }
    }

    /// 处理链路事件
    pub fn handle_event(&mut self, event: LinkEvent, now: Instant) -> StateTransition {
        let transition = self.get_state_transition(self.current_state, event);

        match transition {
            StateTransition::Transition(new_state) => {
                self.transition_to_state(new_state, now);
            }
            StateTransition::TransitionWithReset(new_state) => {
                self.retry_count = 0;
                self.transition_to_state(new_state, now);
            }
            StateTransition::Stay => {}
        }

        transition
    }

    /// 内部状态转换逻辑
    fn transition_to_state(&mut self, new_state: LinkState, now: Instant) {
        if new_state == self.current_state {
            return;
        }

        match new_state {
            LinkState::Online => crate::log!("[LINK] Link up"),
            LinkState::Offline => {
                crate::log!("[LINK] Link lost");
                // 断开后立即尝试一次重连
                self.next_retry = None;
            }
            LinkState::Connecting => {}
        }

        self.previous_state = Some(self.current_state);
        self.current_state = new_state;
        self.state_entry_time = now;
    }

    /// 获取状态转换规则
    fn get_state_transition(&self, current_state: LinkState, event: LinkEvent) -> StateTransition {
        match (current_state, event) {
            (LinkState::Connecting, LinkEvent::LinkUp) => {
                StateTransition::TransitionWithReset(LinkState::Online)
            }
            (LinkState::Offline, LinkEvent::LinkUp) => {
                StateTransition::TransitionWithReset(LinkState::Online)
            }
            (LinkState::Online, LinkEvent::LinkLost) => {
                StateTransition::Transition(LinkState::Offline)
            }

            // 默认情况：保持当前状态
            _ => StateTransition::Stay,
        }
    }
}
