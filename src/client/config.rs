use std::time::Duration;
use crate::chunk::MessageStreamIdLayout;
use crate::client::StreamTarget;
use crate::connection::{NegotiationSettings, ResponseFraming};
use crate::handshake::RTMP_VERSION;
use crate::media::DEFAULT_PUMP_CAPACITY;
use crate::protocol::{ConnectParams, DEFAULT_CONNECTION_TYPE, DEFAULT_FLASH_VER, DEFAULT_WINDOW_SIZE};
use crate::{Error, Result};

/// Smallest and largest chunk size the client will announce
pub const MIN_CHUNK_SIZE: u32 = 128;
pub const MAX_CHUNK_SIZE: u32 = 65536;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Version byte sent in C0
    pub version: u8,

    /// Chunk size announced after `connect`
    pub chunk_size: u32,

    /// Window acknowledgement size
    pub window_ack_size: u32,

    /// Application used when the target URL names none
    pub app: String,

    /// `type` property of `connect`
    pub connection_type: String,

    /// `flashVer` property of `connect`
    pub flash_ver: String,

    /// `tcUrl` override; derived from the target when unset
    pub tc_url: Option<String>,

    /// Frames buffered between encoder and writer
    pub pump_capacity: usize,

    /// How negotiation responses are delimited
    pub response_framing: ResponseFraming,

    /// Message stream id byte layout
    pub stream_id_layout: MessageStreamIdLayout,

    /// Disable Nagle on the TCP socket
    pub tcp_nodelay: bool,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Handshake timeout
    pub handshake_timeout: Duration,

    /// Timeout for the whole negotiation sequence
    pub negotiation_timeout: Duration,

    /// Timeout for writing one frame
    pub write_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            version: RTMP_VERSION,
            chunk_size: 4096,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            app: "live".to_string(),
            connection_type: DEFAULT_CONNECTION_TYPE.to_string(),
            flash_ver: DEFAULT_FLASH_VER.to_string(),
            tc_url: None,
            pump_capacity: DEFAULT_PUMP_CAPACITY,
            response_framing: ResponseFraming::default(),
            stream_id_layout: MessageStreamIdLayout::default(),
            tcp_nodelay: true,
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            negotiation_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Create config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::config(format!("Chunk size must be at least {}", MIN_CHUNK_SIZE)));
        }

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::config(format!("Chunk size must not exceed {}", MAX_CHUNK_SIZE)));
        }

        if self.window_ack_size == 0 {
            return Err(Error::config("Window acknowledgement size must not be zero"));
        }

        if self.pump_capacity == 0 {
            return Err(Error::config("Pump capacity must not be zero"));
        }

        if self.app.is_empty() {
            return Err(Error::config("App name must not be empty"));
        }

        if self.flash_ver.is_empty() {
            return Err(Error::config("flashVer must not be empty"));
        }

        Ok(())
    }

    /// What the negotiator sends for this target
    pub fn negotiation_settings(&self, target: &StreamTarget) -> NegotiationSettings {
        let app = target.app().unwrap_or(self.app.as_str()).to_string();
        let tc_url = self.tc_url.clone().unwrap_or_else(|| target.tc_url(&app));

        NegotiationSettings {
            connect: ConnectParams {
                app,
                connection_type: self.connection_type.clone(),
                flash_ver: self.flash_ver.clone(),
                tc_url,
            },
            chunk_size: self.chunk_size,
            window_ack_size: self.window_ack_size,
            response_framing: self.response_framing,
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    pub fn version(mut self, version: u8) -> Self {
        self.config.version = version;
        self
    }

    /// Set chunk size
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    pub fn app(mut self, app: impl Into<String>) -> Self {
        self.config.app = app.into();
        self
    }

    pub fn connection_type(mut self, connection_type: impl Into<String>) -> Self {
        self.config.connection_type = connection_type.into();
        self
    }

    pub fn flash_ver(mut self, flash_ver: impl Into<String>) -> Self {
        self.config.flash_ver = flash_ver.into();
        self
    }

    pub fn tc_url(mut self, tc_url: impl Into<String>) -> Self {
        self.config.tc_url = Some(tc_url.into());
        self
    }

    pub fn pump_capacity(mut self, capacity: usize) -> Self {
        self.config.pump_capacity = capacity;
        self
    }

    pub fn response_framing(mut self, framing: ResponseFraming) -> Self {
        self.config.response_framing = framing;
        self
    }

    pub fn stream_id_layout(mut self, layout: MessageStreamIdLayout) -> Self {
        self.config.stream_id_layout = layout;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.config.negotiation_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
