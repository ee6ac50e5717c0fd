//! Authorization gate for key-batch reads.

use crate::config::{Principal, SecurityGroupConfig};

/// Identity of a caller as established at channel setup.
///
/// Anonymous callers are ones whose channel carried no identity token.
/// Deployments that disable anonymous access reject them during channel
/// establishment, before any request reaches the key service; the variant
/// exists so the authorization gate can also refuse them defensively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerIdentity {
    /// No identity was presented.
    Anonymous,
    /// The channel authenticated this principal.
    Authenticated(Principal),
}

/// Per-group authorization check for key-batch reads.
///
/// Groups may declare a required principal; groups without one admit any
/// authenticated caller. Authentication itself is the channel's job - this
/// gate only compares identities.
pub struct KeyAccessControl;

impl KeyAccessControl {
    /// Whether `caller` may read the group's key batch.
    pub fn authorize(caller: &CallerIdentity, config: &SecurityGroupConfig) -> bool {
        match caller {
            CallerIdentity::Anonymous => false,
            CallerIdentity::Authenticated(principal) => config
                .authorized_principal
                .as_ref()
                .is_none_or(|required| required == principal),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::POLICY_XCHACHA20_POLY1305;

    fn config_requiring(principal: Option<&str>) -> SecurityGroupConfig {
        SecurityGroupConfig {
            name: "TestSecurityGroup".to_string(),
            security_policy_uri: POLICY_XCHACHA20_POLY1305.to_string(),
            key_lifetime: Duration::from_millis(200),
            max_past_key_count: 1,
            max_future_key_count: 1,
            authorized_principal: principal.map(Principal::new),
        }
    }

    #[test]
    fn matching_principal_is_authorized() {
        let config = config_requiring(Some("user1"));
        let caller = CallerIdentity::Authenticated(Principal::new("user1"));

        assert!(KeyAccessControl::authorize(&caller, &config));
    }

    #[test]
    fn mismatched_principal_is_denied() {
        let config = config_requiring(Some("user1"));
        let caller = CallerIdentity::Authenticated(Principal::new("intruder"));

        assert!(!KeyAccessControl::authorize(&caller, &config));
    }

    #[test]
    fn unrestricted_group_admits_any_authenticated_caller() {
        let config = config_requiring(None);
        let caller = CallerIdentity::Authenticated(Principal::new("anyone"));

        assert!(KeyAccessControl::authorize(&caller, &config));
    }

    #[test]
    fn anonymous_is_always_denied() {
        assert!(!KeyAccessControl::authorize(
            &CallerIdentity::Anonymous,
            &config_requiring(None)
        ));
        assert!(!KeyAccessControl::authorize(
            &CallerIdentity::Anonymous,
            &config_requiring(Some("user1"))
        ));
    }
}
