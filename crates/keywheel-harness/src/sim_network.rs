//! In-memory secure-channel transport.
//!
//! Stands in for the real channel stack: servers register under an
//! authority (`host:port`), channel establishment authenticates the
//! presented identity, and calls are serviced synchronously by the server
//! endpoint. Requests and responses round-trip through the CBOR codec so
//! simulation traffic exercises the same payload path as production.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use keywheel_client::{
    ChannelConfig, ChannelError, ChannelIdentity, EndpointUrl, SecureChannel,
    SecureChannelTransport,
};
use keywheel_core::{CallerIdentity, Principal};
use keywheel_proto::{
    ServiceRequest, ServiceResponse, decode_request, decode_response, encode_request,
    encode_response,
};
use keywheel_server::SksServerEndpoint;

struct SimServerState {
    endpoint: SksServerEndpoint,
    allow_anonymous: bool,
    credentials: HashMap<String, String>,
    online: bool,
}

#[derive(Default)]
struct NetworkState {
    servers: HashMap<String, SimServerState>,
    open_attempts: usize,
}

/// Simulated network connecting pull clients to service endpoints.
///
/// Anonymous access is disabled by default, matching a hardened
/// deployment; tests opt back in per server.
#[derive(Clone, Default)]
pub struct SimNetwork {
    inner: Arc<Mutex<NetworkState>>,
}

impl SimNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service endpoint under `authority` (`host:port`).
    pub fn register_server(&self, authority: impl Into<String>, endpoint: SksServerEndpoint) {
        self.lock().servers.insert(
            authority.into(),
            SimServerState {
                endpoint,
                allow_anonymous: false,
                credentials: HashMap::new(),
                online: true,
            },
        );
    }

    /// Accept a username/password pair at `authority`.
    pub fn add_credential(
        &self,
        authority: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) {
        if let Some(server) = self.lock().servers.get_mut(authority) {
            server.credentials.insert(user.into(), password.into());
        }
    }

    /// Permit or forbid anonymous channels at `authority`.
    pub fn allow_anonymous(&self, authority: &str, allow: bool) {
        if let Some(server) = self.lock().servers.get_mut(authority) {
            server.allow_anonymous = allow;
        }
    }

    /// Take a server off the network (connections fail as closed).
    pub fn set_online(&self, authority: &str, online: bool) {
        if let Some(server) = self.lock().servers.get_mut(authority) {
            server.online = online;
        }
    }

    /// How many channel establishments were attempted.
    ///
    /// Lets tests assert that syntactic URL rejection never touched the
    /// transport.
    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SecureChannelTransport for SimNetwork {
    type Channel = SimChannel;

    async fn open(
        &self,
        endpoint: &EndpointUrl,
        config: &ChannelConfig,
    ) -> Result<SimChannel, ChannelError> {
        let mut state = self.lock();
        state.open_attempts += 1;

        let authority = endpoint.authority();
        let server = state.servers.get(&authority).filter(|s| s.online).ok_or_else(|| {
            ChannelError::ConnectionClosed { reason: format!("{authority} is unreachable") }
        })?;

        let caller = match &config.identity {
            ChannelIdentity::Anonymous => {
                if !server.allow_anonymous {
                    return Err(ChannelError::AccessDenied);
                }
                CallerIdentity::Anonymous
            },
            ChannelIdentity::UserName { user, password } => {
                if server.credentials.get(user) != Some(password) {
                    return Err(ChannelError::AccessDenied);
                }
                CallerIdentity::Authenticated(Principal::new(user.clone()))
            },
        };

        Ok(SimChannel { endpoint: server.endpoint.clone(), caller })
    }
}

/// One established simulated channel, bound to its authenticated caller.
pub struct SimChannel {
    endpoint: SksServerEndpoint,
    caller: CallerIdentity,
}

#[async_trait]
impl SecureChannel for SimChannel {
    async fn call(&mut self, request: ServiceRequest) -> Result<ServiceResponse, ChannelError> {
        // Round-trip both directions through the codec, exactly as a real
        // channel would frame them.
        let request_bytes = encode_request(&request)
            .map_err(|err| ChannelError::ConnectionClosed { reason: err.to_string() })?;
        let request = decode_request(&request_bytes)
            .map_err(|err| ChannelError::ConnectionClosed { reason: err.to_string() })?;

        let response = self.endpoint.handle(&self.caller, &request);

        let response_bytes = encode_response(&response)
            .map_err(|err| ChannelError::ConnectionClosed { reason: err.to_string() })?;
        decode_response(&response_bytes)
            .map_err(|err| ChannelError::ConnectionClosed { reason: err.to_string() })
    }
}
