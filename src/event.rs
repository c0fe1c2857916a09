use std::fmt::Display;

/// Provider event names this crate knows about. Subscriptions are accepted
/// for any name; only `Connect` and `ChainChanged` carry a payload rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged,
    ChainChanged,
    Connect,
    Disconnect,
    Message,
}

impl WalletEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEvent::AccountsChanged => "accountsChanged",
            WalletEvent::ChainChanged => "chainChanged",
            WalletEvent::Connect => "connect",
            WalletEvent::Disconnect => "disconnect",
            WalletEvent::Message => "message",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "accountsChanged" => Some(WalletEvent::AccountsChanged),
            "chainChanged" => Some(WalletEvent::ChainChanged),
            "connect" => Some(WalletEvent::Connect),
            "disconnect" => Some(WalletEvent::Disconnect),
            "message" => Some(WalletEvent::Message),
            _ => None,
        }
    }
}

impl Display for WalletEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
