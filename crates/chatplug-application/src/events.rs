//! Backend event payloads.
//!
//! The plugin host pushes `(channel, json)` pairs. [`PluginEvent::parse`]
//! turns them into a closed union; unrecognised channels and stream types
//! map to `Unknown` variants instead of errors so they can be logged and
//! dropped.

use chatplug_core::error::Result;
use serde::Deserialize;

pub const CHANNEL_MESSAGE: &str = "plugin-message";
pub const CHANNEL_STREAM: &str = "plugin-stream";
pub const CHANNEL_DISCONNECT_REQUEST: &str = "plugin-disconnect-request";
pub const CHANNEL_MOUNTED: &str = "plugin-mounted";
pub const CHANNEL_DISPOSED: &str = "plugin-disposed";
pub const CHANNEL_CONNECTED: &str = "plugin-connected";
pub const CHANNEL_DISCONNECTED: &str = "plugin-disconnected";

/// One raw item from the host's event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEvent {
    pub channel: String,
    pub payload: String,
}

impl BackendEvent {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Lifecycle notices announced by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Mounted,
    Disposed,
    Connected,
    Disconnected,
}

impl LifecycleKind {
    fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            CHANNEL_MOUNTED => Some(Self::Mounted),
            CHANNEL_DISPOSED => Some(Self::Disposed),
            CHANNEL_CONNECTED => Some(Self::Connected),
            CHANNEL_DISCONNECTED => Some(Self::Disconnected),
            _ => None,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Mounted => "mounted",
            Self::Disposed => "disposed",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Start,
    Data { chunk: String, is_final: bool },
    /// A missing `success` flag counts as a failure.
    End { success: bool },
    Pause,
    Resume,
    Cancel,
    Unknown { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    Message {
        plugin_id: String,
        instance_id: Option<String>,
        content: String,
        message_id: Option<String>,
    },
    Stream {
        plugin_id: String,
        instance_id: Option<String>,
        stream_id: String,
        event: StreamEvent,
    },
    DisconnectRequest {
        instance_id: String,
    },
    Lifecycle {
        kind: LifecycleKind,
        plugin: String,
    },
    Unknown {
        channel: String,
    },
}

#[derive(Deserialize)]
struct MessagePayload {
    plugin_id: String,
    #[serde(default)]
    instance_id: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    plugin_id: String,
    #[serde(default)]
    instance_id: Option<String>,
    data: StreamData,
}

#[derive(Deserialize)]
struct StreamData {
    stream_id: String,
    #[serde(default)]
    chunk: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
struct DisconnectRequestPayload {
    instance_id: String,
}

#[derive(Deserialize)]
struct LifecyclePayload {
    plugin: String,
}

impl PluginEvent {
    /// Parses one backend event. Fails only on a malformed payload.
    pub fn parse(event: &BackendEvent) -> Result<Self> {
        let payload = event.payload.as_str();
        let parsed = match event.channel.as_str() {
            CHANNEL_MESSAGE => {
                let p: MessagePayload = serde_json::from_str(payload)?;
                Self::Message {
                    plugin_id: p.plugin_id,
                    instance_id: p.instance_id,
                    content: p.content,
                    message_id: p.message_id,
                }
            }
            CHANNEL_STREAM => {
                let p: StreamPayload = serde_json::from_str(payload)?;
                let event = match p.kind.as_str() {
                    "stream_start" => StreamEvent::Start,
                    "stream_data" => StreamEvent::Data {
                        chunk: p.data.chunk,
                        is_final: p.data.is_final,
                    },
                    "stream_end" => StreamEvent::End {
                        success: p.data.success,
                    },
                    "stream_pause" => StreamEvent::Pause,
                    "stream_resume" => StreamEvent::Resume,
                    "stream_cancel" => StreamEvent::Cancel,
                    _ => StreamEvent::Unknown { kind: p.kind },
                };
                Self::Stream {
                    plugin_id: p.plugin_id,
                    instance_id: p.instance_id,
                    stream_id: p.data.stream_id,
                    event,
                }
            }
            CHANNEL_DISCONNECT_REQUEST => {
                let p: DisconnectRequestPayload = serde_json::from_str(payload)?;
                Self::DisconnectRequest {
                    instance_id: p.instance_id,
                }
            }
            channel => match LifecycleKind::from_channel(channel) {
                Some(kind) => {
                    let p: LifecyclePayload = serde_json::from_str(payload)?;
                    Self::Lifecycle {
                        kind,
                        plugin: p.plugin,
                    }
                }
                None => Self::Unknown {
                    channel: channel.to_string(),
                },
            },
        };
        Ok(parsed)
    }
}
