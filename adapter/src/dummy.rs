use primitives::{
    adapter::{Adapter, AdapterError, AdapterResult, DummyAdapterOptions},
    channel_validator::ChannelValidator,
    Config, ValidatorId,
};

/// Test adapter with a plain-text "signature" scheme and a fixed table
/// of auth tokens. Identities are arbitrary strings.
#[derive(Debug, Clone)]
pub struct DummyAdapter {
    identity: ValidatorId,
    auth_tokens: std::collections::HashMap<ValidatorId, String>,
}

impl ChannelValidator for DummyAdapter {}

impl Adapter for DummyAdapter {
    type Options = DummyAdapterOptions;

    fn init(opts: Self::Options, _config: &Config) -> AdapterResult<Self> {
        Ok(Self {
            identity: opts.dummy_identity,
            auth_tokens: opts.dummy_auth_tokens,
        })
    }

    fn unlock(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    fn whoami(&self) -> &ValidatorId {
        &self.identity
    }

    fn sign(&self, state_root: &str) -> AdapterResult<String> {
        Ok(format!(
            "Dummy adapter signature for {} by {}",
            state_root, self.identity
        ))
    }

    /// Re-derives the expected signature string, so a signature produced
    /// by any other identity (or over any other state root) fails.
    fn verify(
        &self,
        signer: &ValidatorId,
        state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool> {
        let expected = format!("Dummy adapter signature for {} by {}", state_root, signer);

        Ok(signature == expected)
    }

    fn get_auth(&self, validator: &ValidatorId) -> AdapterResult<String> {
        self.auth_tokens.get(validator).cloned().ok_or_else(|| {
            AdapterError::Authentication(format!("no auth token for validator {}", validator))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use primitives::util::tests::prep_db::{AUTH, IDS};

    fn dummy_adapter(identity: &ValidatorId) -> DummyAdapter {
        let options = DummyAdapterOptions {
            dummy_identity: identity.clone(),
            dummy_auth_tokens: AUTH.clone(),
        };

        DummyAdapter::init(options, &primitives::config::DEVELOPMENT_CONFIG.clone())
            .expect("should init")
    }

    #[test]
    fn signs_and_verifies_a_state_root() {
        let adapter = dummy_adapter(&IDS["leader"]);
        let state_root = "b1a4fc6c1a1e1ab908a487e504006edcebea297f61b4b8ce6cad80b6985dd2ba";

        let signature = adapter.sign(state_root).expect("should sign");
        assert_eq!(
            format!(
                "Dummy adapter signature for {} by awesomeLeader",
                state_root
            ),
            signature
        );

        assert!(adapter
            .verify(&IDS["leader"], state_root, &signature)
            .expect("should verify"));
    }

    #[test]
    fn rejects_a_signature_from_a_different_identity() {
        let leader = dummy_adapter(&IDS["leader"]);
        let follower = dummy_adapter(&IDS["follower"]);
        let state_root = "b1a4fc6c1a1e1ab908a487e504006edcebea297f61b4b8ce6cad80b6985dd2ba";

        let follower_signature = follower.sign(state_root).expect("should sign");

        assert!(!leader
            .verify(&IDS["leader"], state_root, &follower_signature)
            .expect("should verify"));
    }

    #[test]
    fn rejects_a_signature_over_a_different_state_root() {
        let adapter = dummy_adapter(&IDS["leader"]);

        let signature = adapter.sign("aaaa").expect("should sign");

        assert!(!adapter
            .verify(&IDS["leader"], "bbbb", &signature)
            .expect("should verify"));
    }

    #[test]
    fn auth_tokens_come_from_the_fixture_table() {
        let adapter = dummy_adapter(&IDS["leader"]);

        assert_eq!(
            "AUTH_awesomeFollower",
            adapter.get_auth(&IDS["follower"]).expect("should resolve")
        );
        assert!(adapter.get_auth(&"strangerDanger".into()).is_err());
    }
}
