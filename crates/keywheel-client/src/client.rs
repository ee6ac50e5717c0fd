//! Pull client state machine.
//!
//! One `SksClient` serves one (local group, remote endpoint) pairing. The
//! embedding event loop drives it: `configure` validates and arms the pull,
//! each `pull` performs one attempt over the transport, and the outcome is
//! published through a watch channel the loop polls. Re-polling while
//! `Installed` - so the mirror observes server-side rotations - is the
//! loop's own scheduling decision; the client never retries by itself.

use keywheel_core::{KeyBatch, KeyMaterial};
use keywheel_crypto::KeySecret;
use keywheel_proto::{
    GetSecurityKeysRequest, SecurityKeysResponse, ServiceRequest, ServiceResponse, StatusCode,
    WireKeyMaterial,
};
use tokio::sync::watch;

use crate::{
    binding::GroupKeyBinding,
    error::{PullFailure, SksClientError},
    transport::{ChannelConfig, ChannelError, EndpointUrl, SecureChannel, SecureChannelTransport},
};

/// Client state machine position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SksClientState {
    /// No pull configuration stored yet.
    Unconfigured,
    /// Configuration stored; transport establishment is the next step.
    Connecting,
    /// Channel established; identity token presented.
    Authenticating,
    /// `GetSecurityKeys` request outstanding.
    PullingKeys,
    /// A batch is installed in the local mirror.
    Installed,
    /// Terminal failure; reachable from any non-terminal state.
    Failed(PullFailure),
}

/// Pull outcome published through the completion channel.
///
/// Everything that is not `Good` or `Failed` is simply "not yet good";
/// callers poll rather than block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// No pull has been requested.
    Idle,
    /// A pull is armed or outstanding.
    Pending,
    /// The last pull installed a batch.
    Good,
    /// The last pull failed.
    Failed(PullFailure),
}

impl PullStatus {
    /// Whether the last pull completed successfully.
    pub fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }

    /// Whether the last pull ended in a terminal failure.
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Stored pull parameters.
#[derive(Debug, Clone)]
struct PullConfig {
    channel: ChannelConfig,
    endpoint: EndpointUrl,
}

/// Pull client for one writer/reader group.
///
/// Owns the group's [`GroupKeyBinding`]; a successful pull installs the
/// batch into the process mirror and flips the binding operational.
pub struct SksClient {
    state: SksClientState,
    config: Option<PullConfig>,
    binding: GroupKeyBinding,
    status_tx: watch::Sender<PullStatus>,
}

impl SksClient {
    /// Create an unconfigured client around a group binding.
    pub fn new(binding: GroupKeyBinding) -> Self {
        let (status_tx, _) = watch::channel(PullStatus::Idle);
        Self { state: SksClientState::Unconfigured, config: None, binding, status_tx }
    }

    /// Current state machine position.
    pub fn state(&self) -> &SksClientState {
        &self.state
    }

    /// The bound writer/reader group.
    pub fn binding(&self) -> &GroupKeyBinding {
        &self.binding
    }

    /// Completion channel the embedding loop polls for pull outcomes.
    pub fn completion(&self) -> watch::Receiver<PullStatus> {
        self.status_tx.subscribe()
    }

    /// Validate and store the pull configuration, arming the first pull.
    ///
    /// Validation is purely syntactic and performs no I/O. Re-configuring
    /// is permitted at any time, including while a pull is outstanding;
    /// whichever response installs last wins.
    ///
    /// # Errors
    ///
    /// `InvalidEndpointUrl` if the URL is malformed. Nothing is stored and
    /// no connection is ever attempted in that case.
    pub fn configure(
        &mut self,
        channel: ChannelConfig,
        endpoint_url: &str,
    ) -> Result<(), SksClientError> {
        let endpoint = EndpointUrl::parse(endpoint_url)?;

        tracing::debug!(group = %self.binding.group_id(), %endpoint, "pull configured");
        self.config = Some(PullConfig { channel, endpoint });
        self.state = SksClientState::Connecting;
        self.status_tx.send_replace(PullStatus::Pending);
        Ok(())
    }

    /// Perform one pull attempt over the transport.
    ///
    /// Opens a channel, issues `GetSecurityKeys` for the bound group,
    /// installs the response into the mirror, and publishes the outcome.
    /// Failures are terminal for this attempt and are not retried here.
    ///
    /// # Errors
    ///
    /// `NotConfigured` if `configure` has not succeeded yet. All other
    /// failures are reported through the returned [`PullStatus`] and the
    /// completion channel, not as `Err`.
    pub async fn pull<T: SecureChannelTransport>(
        &mut self,
        transport: &T,
    ) -> Result<PullStatus, SksClientError> {
        let config = self.config.clone().ok_or(SksClientError::NotConfigured)?;

        self.state = SksClientState::Connecting;
        self.status_tx.send_replace(PullStatus::Pending);

        let mut channel = match transport.open(&config.endpoint, &config.channel).await {
            Ok(channel) => channel,
            Err(err) => return Ok(self.fail(failure_for_channel(&err))),
        };

        self.state = SksClientState::Authenticating;

        let request = ServiceRequest::GetSecurityKeys(GetSecurityKeysRequest {
            security_group_id: self.binding.group_id().as_str().to_string(),
            // The service clamps to the group's configured window.
            requested_past_count: u32::MAX,
            requested_future_count: u32::MAX,
        });

        self.state = SksClientState::PullingKeys;
        let response = match channel.call(request).await {
            Ok(response) => response,
            Err(err) => return Ok(self.fail(failure_for_channel(&err))),
        };

        match response {
            ServiceResponse::SecurityKeys(response) => {
                self.install(response);
                Ok(PullStatus::Good)
            },
            ServiceResponse::Fault(fault) => {
                let failure = match fault.status {
                    StatusCode::BadAccessDenied => PullFailure::AccessDenied,
                    status => PullFailure::ServiceFault(status),
                };
                tracing::warn!(group = %self.binding.group_id(), fault = %fault.message,
                    "service rejected key pull");
                Ok(self.fail(failure))
            },
        }
    }

    fn install(&mut self, response: SecurityKeysResponse) {
        let batch = KeyBatch {
            past: response.past_keys.iter().map(from_wire).collect(),
            current: from_wire(&response.current_key),
            future: response.future_keys.iter().map(from_wire).collect(),
        };

        // Lock scope covers only the install; the response was fully
        // received before this point.
        let binding = &self.binding;
        binding.registry().with_mut(|reg| {
            reg.install_mirror(
                binding.group_id(),
                response.security_policy_uri.clone(),
                response.key_lifetime,
                batch,
            );
        });
        self.binding.keys_installed();

        tracing::debug!(group = %self.binding.group_id(),
            current = response.current_key.key_id, "key batch installed");
        self.state = SksClientState::Installed;
        self.status_tx.send_replace(PullStatus::Good);
    }

    fn fail(&mut self, failure: PullFailure) -> PullStatus {
        tracing::warn!(group = %self.binding.group_id(), %failure, "key pull failed");
        self.state = SksClientState::Failed(failure);
        let status = PullStatus::Failed(failure);
        self.status_tx.send_replace(status);
        status
    }
}

fn failure_for_channel(err: &ChannelError) -> PullFailure {
    match err {
        ChannelError::ConnectionClosed { .. } => PullFailure::ConnectionClosed,
        ChannelError::AccessDenied => PullFailure::AccessDenied,
    }
}

fn from_wire(wire: &WireKeyMaterial) -> KeyMaterial {
    KeyMaterial::from_secret(wire.key_id, KeySecret::from_bytes(wire.secret))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use keywheel_core::{POLICY_XCHACHA20_POLY1305, SecurityGroupId, SharedRegistry};
    use keywheel_proto::ServiceFault;

    use super::*;
    use crate::binding::{SecurityMode, set_group_operational};

    const ENDPOINT: &str = "sks.tcp://localhost:4840";

    /// Scripted transport standing in for a real secure channel stack.
    #[derive(Clone)]
    enum StubTransport {
        Unreachable,
        RejectIdentity,
        Respond(Box<ServiceResponse>),
    }

    struct StubChannel {
        response: ServiceResponse,
    }

    #[async_trait]
    impl SecureChannel for StubChannel {
        async fn call(&mut self, _: ServiceRequest) -> Result<ServiceResponse, ChannelError> {
            Ok(self.response.clone())
        }
    }

    #[async_trait]
    impl SecureChannelTransport for StubTransport {
        type Channel = StubChannel;

        async fn open(
            &self,
            _: &EndpointUrl,
            _: &ChannelConfig,
        ) -> Result<StubChannel, ChannelError> {
            match self {
                Self::Unreachable => {
                    Err(ChannelError::ConnectionClosed { reason: "no route".to_string() })
                },
                Self::RejectIdentity => Err(ChannelError::AccessDenied),
                Self::Respond(response) => Ok(StubChannel { response: (**response).clone() }),
            }
        }
    }

    fn test_client() -> SksClient {
        let binding = GroupKeyBinding::new(
            SecurityGroupId::new("TestSecurityGroup"),
            SharedRegistry::new(),
            SecurityMode::SignAndEncrypt,
        );
        SksClient::new(binding)
    }

    fn keys_response(base_id: u32) -> ServiceResponse {
        ServiceResponse::SecurityKeys(SecurityKeysResponse {
            security_policy_uri: POLICY_XCHACHA20_POLY1305.to_string(),
            key_lifetime: Duration::from_millis(200),
            past_keys: vec![],
            current_key: WireKeyMaterial { key_id: base_id, secret: [0x31; 32] },
            future_keys: vec![WireKeyMaterial { key_id: base_id + 1, secret: [0x32; 32] }],
        })
    }

    #[test]
    fn pull_before_configure_is_rejected() {
        let mut client = test_client();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let result = runtime.block_on(client.pull(&StubTransport::Unreachable));
        assert!(matches!(result, Err(SksClientError::NotConfigured)));
    }

    #[test]
    fn invalid_endpoint_url_fails_without_storing_anything() {
        let mut client = test_client();

        let result = client.configure(
            ChannelConfig::user_name("user1", "password"),
            "sks.tcp://[invalid:host]:4840",
        );

        assert!(matches!(result, Err(SksClientError::InvalidEndpointUrl(_))));
        assert_eq!(*client.state(), SksClientState::Unconfigured);
        assert_eq!(*client.completion().borrow(), PullStatus::Idle);
    }

    #[tokio::test]
    async fn unreachable_endpoint_reaches_failed_connection_closed() {
        let mut client = test_client();
        client
            .configure(ChannelConfig::user_name("user1", "password"), "sks.tcp://wronghost:4840")
            .unwrap();

        let status = client.pull(&StubTransport::Unreachable).await.unwrap();

        assert_eq!(status, PullStatus::Failed(PullFailure::ConnectionClosed));
        assert_eq!(*client.state(), SksClientState::Failed(PullFailure::ConnectionClosed));
        assert!(!client.binding().is_operational());
    }

    #[tokio::test]
    async fn rejected_identity_reaches_failed_access_denied() {
        let mut client = test_client();
        client.configure(ChannelConfig::anonymous(), ENDPOINT).unwrap();

        let status = client.pull(&StubTransport::RejectIdentity).await.unwrap();

        assert_eq!(status, PullStatus::Failed(PullFailure::AccessDenied));
        assert!(!client.binding().is_operational(), "denied client never reaches Installed");
    }

    #[tokio::test]
    async fn service_level_denial_reaches_failed_access_denied() {
        let mut client = test_client();
        client.configure(ChannelConfig::user_name("intruder", "pw"), ENDPOINT).unwrap();

        let fault = ServiceResponse::Fault(ServiceFault {
            status: StatusCode::BadAccessDenied,
            message: "identity rejected".to_string(),
        });
        let status = client.pull(&StubTransport::Respond(Box::new(fault))).await.unwrap();

        assert_eq!(status, PullStatus::Failed(PullFailure::AccessDenied));
    }

    #[tokio::test]
    async fn successful_pull_installs_and_turns_operational() {
        let mut client = test_client();
        let completion = client.completion();
        client.configure(ChannelConfig::user_name("user1", "password"), ENDPOINT).unwrap();

        let status = client
            .pull(&StubTransport::Respond(Box::new(keys_response(5))))
            .await
            .unwrap();

        assert!(status.is_good());
        assert_eq!(*client.state(), SksClientState::Installed);
        assert_eq!(*completion.borrow(), PullStatus::Good);
        assert!(client.binding().is_operational());
        assert_eq!(client.binding().current_key_id(), Some(5));
        assert!(set_group_operational(client.binding()).is_ok());
    }

    #[tokio::test]
    async fn later_pull_replaces_the_mirror_wholesale() {
        let mut client = test_client();
        client.configure(ChannelConfig::user_name("user1", "password"), ENDPOINT).unwrap();

        client.pull(&StubTransport::Respond(Box::new(keys_response(5)))).await.unwrap();
        client.pull(&StubTransport::Respond(Box::new(keys_response(9)))).await.unwrap();

        assert_eq!(client.binding().current_key_id(), Some(9));
    }

    #[tokio::test]
    async fn unknown_group_fault_is_surfaced_as_service_fault() {
        let mut client = test_client();
        client.configure(ChannelConfig::user_name("user1", "password"), ENDPOINT).unwrap();

        let fault = ServiceResponse::Fault(ServiceFault {
            status: StatusCode::BadNotFound,
            message: "unknown security group".to_string(),
        });
        let status = client.pull(&StubTransport::Respond(Box::new(fault))).await.unwrap();

        assert_eq!(status, PullStatus::Failed(PullFailure::ServiceFault(StatusCode::BadNotFound)));
    }
}
