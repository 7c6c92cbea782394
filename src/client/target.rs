use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use url::{Host, Url};
use crate::protocol::DEFAULT_PORT;
use crate::{Error, Result};

/// Where to publish: host, port and optionally the application name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    host: String,
    port: u16,
    app: Option<String>,
}

impl StreamTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        StreamTarget {
            host: host.into(),
            port,
            app: None,
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Parse `rtmp://host[:port][/app[/...]]`
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid URL: {}", e)))?;

        if parsed.scheme() != "rtmp" {
            return Err(Error::config(format!("Unsupported scheme: {}", parsed.scheme())));
        }

        // IPv6 literals are kept without their brackets so they can be dialed
        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::config("Missing host in URL")),
        };
        let port = parsed.port().unwrap_or(DEFAULT_PORT);

        let app = parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        Ok(StreamTarget {
            host,
            port,
            app,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    /// `tcUrl` for the given application; the default port is left out
    pub fn tc_url(&self, app: &str) -> String {
        if self.port == DEFAULT_PORT {
            format!("rtmp://{}/{}", self.url_host(), app)
        } else {
            format!("rtmp://{}:{}/{}", self.url_host(), self.port, app)
        }
    }

    /// Host as written in a URL, IPv6 literals bracketed
    fn url_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.url_host(), self.port)?;
        if let Some(app) = &self.app {
            write!(f, "/{}", app)?;
        }
        Ok(())
    }
}

/// Byte stream a session runs over
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Opens the byte stream for a target
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &StreamTarget) -> Result<Box<dyn Transport>>;
}

/// Plain TCP
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    nodelay: bool,
}

impl TcpConnector {
    pub fn new(nodelay: bool) -> Self {
        TcpConnector { nodelay }
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, target: &StreamTarget) -> Result<Box<dyn Transport>> {
        let stream = TcpStream::connect((target.host(), target.port())).await?;

        // Set TCP options
        if self.nodelay {
            stream.set_nodelay(true)?;
        }

        Ok(Box::new(stream))
    }
}
