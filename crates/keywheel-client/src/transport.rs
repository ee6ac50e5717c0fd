//! Secure channel abstraction and endpoint addressing.
//!
//! The client consumes the transport through these traits; the concrete
//! implementation (a real network stack in production, an in-memory
//! simulation in tests) lives elsewhere. Channel establishment is where
//! authentication happens - a channel handed to the client is already bound
//! to a caller identity.

use async_trait::async_trait;
use keywheel_proto::{ServiceRequest, ServiceResponse};
use thiserror::Error;

/// A syntactically malformed endpoint URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid endpoint url {url:?}: {reason}")]
pub struct EndpointUrlError {
    /// The offending URL.
    pub url: String,
    /// What failed to parse.
    pub reason: String,
}

/// Parsed endpoint address: `scheme://host:port`.
///
/// Validation is purely syntactic and never touches the network; whether
/// the host exists is only discovered when a channel is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    scheme: String,
    host: String,
    port: u16,
}

impl EndpointUrl {
    /// Parse and validate an endpoint URL.
    pub fn parse(url: &str) -> Result<Self, EndpointUrlError> {
        let err = |reason: &str| EndpointUrlError { url: url.to_string(), reason: reason.to_string() };

        let (scheme, rest) = url.split_once("://").ok_or_else(|| err("missing scheme"))?;
        if scheme.is_empty()
            || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
        {
            return Err(err("malformed scheme"));
        }

        let (host, port) = rest.rsplit_once(':').ok_or_else(|| err("missing port"))?;
        if host.is_empty() {
            return Err(err("empty host"));
        }
        if !host.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-')) {
            return Err(err("malformed host"));
        }
        let port = port.parse::<u16>().map_err(|_| err("malformed port"))?;

        Ok(Self { scheme: scheme.to_string(), host: host.to_string(), port })
    }

    /// URL scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or address literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, the part a transport resolves.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Identity presented during channel establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelIdentity {
    /// No identity token.
    Anonymous,
    /// Username/password token.
    UserName {
        /// Principal name.
        user: String,
        /// Shared secret.
        password: String,
    },
}

/// Client-side channel configuration: which suite to negotiate and which
/// identity to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Security policy to negotiate for the channel itself.
    pub security_policy_uri: String,
    /// Identity token presented to the endpoint.
    pub identity: ChannelIdentity,
}

impl ChannelConfig {
    /// Channel-level protection suite negotiated by default.
    pub const DEFAULT_POLICY_URI: &'static str = "urn:keywheel:channelpolicy:sign-encrypt-v1";

    /// Configuration presenting no identity.
    pub fn anonymous() -> Self {
        Self {
            security_policy_uri: Self::DEFAULT_POLICY_URI.to_string(),
            identity: ChannelIdentity::Anonymous,
        }
    }

    /// Configuration presenting a username/password token.
    pub fn user_name(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            security_policy_uri: Self::DEFAULT_POLICY_URI.to_string(),
            identity: ChannelIdentity::UserName { user: user.into(), password: password.into() },
        }
    }
}

/// Errors from channel establishment or a call over it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The endpoint is unreachable or the connection dropped.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Transport-level detail.
        reason: String,
    },

    /// The endpoint rejected the presented identity.
    #[error("channel authentication rejected")]
    AccessDenied,
}

/// An established, authenticated secure channel.
#[async_trait]
pub trait SecureChannel: Send {
    /// Issue one service request and await its response.
    async fn call(&mut self, request: ServiceRequest) -> Result<ServiceResponse, ChannelError>;
}

/// Factory opening secure channels to service endpoints.
#[async_trait]
pub trait SecureChannelTransport: Send + Sync {
    /// Channel type this transport produces.
    type Channel: SecureChannel;

    /// Open and authenticate a channel to `endpoint`.
    async fn open(
        &self,
        endpoint: &EndpointUrl,
        config: &ChannelConfig,
    ) -> Result<Self::Channel, ChannelError>;
}
