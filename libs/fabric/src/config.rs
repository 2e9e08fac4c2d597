//! Serde-friendly settings for clients and server sockets.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::server::ServerSocketBuilder;
use crate::transport::TcpTransportBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSocketConfig {
    pub listen_addr: String,
    /// Read/write timeout for accepted connections; 0 disables it
    pub client_timeout_ms: u64,
}

impl Default for ServerSocketConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".to_string(),
            client_timeout_ms: 0,
        }
    }
}

impl ServerSocketConfig {
    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }

    pub fn builder(&self) -> ServerSocketBuilder {
        ServerSocketBuilder::new()
            .address(self.listen_addr.clone())
            .client_timeout(self.client_timeout())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub addr: SocketAddr,
    pub connect_timeout_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 9090)),
            connect_timeout_ms: None,
            timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn builder(&self) -> TcpTransportBuilder {
        let mut builder = TcpTransportBuilder::new().address(self.addr);
        if let Some(ms) = self.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.timeout_ms {
            builder = builder
                .send_timeout(Duration::from_millis(ms))
                .receive_timeout(Duration::from_millis(ms));
        }
        builder
    }
}
