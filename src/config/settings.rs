use serde::Deserialize;

use crate::protocol::MAX_PACKET_SIZE;

/// Top-level configuration settings for the broker.
///
/// Includes settings for the listener, the broker registries and logging.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Configuration settings for the listener.
///
/// Defines the host and port the broker accepts connections on.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Live connections beyond this are closed right after accept.
    pub max_connections: usize,
    /// Idle read timeout per connection; `0` disables it.
    pub read_timeout_secs: u64,
    /// When `false`, subscribing twice to one topic records the connection once.
    pub allow_duplicate_subscriptions: bool,
    /// When `true`, a malformed PUBLISH/SUBSCRIBE/UNSUBSCRIBE body ends the
    /// connection instead of only dropping that packet.
    pub close_on_malformed: bool,
    /// Largest packet, header included, a connection may send. Bigger
    /// packets close the connection once their fixed header arrives.
    pub max_packet_size: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub read_timeout_secs: Option<u64>,
    pub allow_duplicate_subscriptions: Option<bool>,
    pub close_on_malformed: Option<bool>,
    pub max_packet_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            broker: BrokerSettings::default(),
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1883,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            read_timeout_secs: 300,
            allow_duplicate_subscriptions: false,
            close_on_malformed: false,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl PartialSettings {
    /// Fills every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server;
        let broker = self.broker;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            broker: BrokerSettings {
                max_connections: broker
                    .as_ref()
                    .and_then(|b| b.max_connections)
                    .unwrap_or(default.broker.max_connections),
                read_timeout_secs: broker
                    .as_ref()
                    .and_then(|b| b.read_timeout_secs)
                    .unwrap_or(default.broker.read_timeout_secs),
                allow_duplicate_subscriptions: broker
                    .as_ref()
                    .and_then(|b| b.allow_duplicate_subscriptions)
                    .unwrap_or(default.broker.allow_duplicate_subscriptions),
                close_on_malformed: broker
                    .as_ref()
                    .and_then(|b| b.close_on_malformed)
                    .unwrap_or(default.broker.close_on_malformed),
                max_packet_size: broker
                    .as_ref()
                    .and_then(|b| b.max_packet_size)
                    .unwrap_or(default.broker.max_packet_size),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}
