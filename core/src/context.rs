//! Explicit bridge state: transport, request limits and model registry.
//!
//! # Design
//! Constructing a `BridgeContext` is initialization and consuming it with
//! `cleanup` is teardown; there is no process-wide state. A context is meant
//! to be driven from one thread at a time.

use log::{debug, info};

use crate::client::ChatClient;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::marshal::GenerationResponse;
use crate::registry::{Model, ModelRegistry};
use crate::transport::{self, Transport};

pub struct BridgeContext {
    client: ChatClient,
    transport: Box<dyn Transport>,
    registry: ModelRegistry,
}

impl BridgeContext {
    /// Initialize with the backend named in `config`.
    pub fn init(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let transport = transport::for_backend(config.backend, config.endpoint.clone());
        info!(
            "bridge initialized: {} backend, endpoint {}",
            config.backend,
            config.endpoint.url()
        );
        Self::with_transport(config, transport)
    }

    /// Initialize with a caller-supplied transport.
    pub fn with_transport(
        config: &BridgeConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, BridgeError> {
        Ok(Self {
            client: ChatClient::new(config),
            transport,
            registry: ModelRegistry::with_placeholder_models()?,
        })
    }

    /// Send one prompt and return the buffered reply.
    pub fn generate(&self, model: &str, prompt: &str) -> Result<GenerationResponse, BridgeError> {
        let response = self.client.send(&self.transport, model, prompt)?;
        debug!(
            "generate: model {model} status {} size {}",
            response.status_code(),
            response.response_size()
        );
        Ok(GenerationResponse::from(response))
    }

    pub fn list_models(&self) -> &[Model] {
        self.registry.as_slice()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Always true: a context exists only between init and cleanup, so
    /// holding one means the bridge is initialized. Kept so the binding's
    /// `isInitialized` reads from the context rather than from `Option`
    /// state alone.
    pub fn is_initialized(&self) -> bool {
        true
    }

    /// Release the transport and the registry.
    pub fn cleanup(self) {
        debug!("bridge cleaned up ({} models released)", self.registry.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::FakeTransport;
    use std::io;

    fn context(fake: FakeTransport) -> BridgeContext {
        BridgeContext::with_transport(&BridgeConfig::default(), Box::new(fake)).unwrap()
    }

    #[test]
    fn init_seeds_placeholder_models() {
        let ctx = BridgeContext::init(&BridgeConfig::default()).unwrap();
        assert!(ctx.is_initialized());
        assert_eq!(ctx.list_models().len(), 3);
        ctx.cleanup();
    }

    #[test]
    fn generate_marshals_response() {
        let ctx = context(FakeTransport::new().reply(200, ["{\"resp", "onse\":\"hi\"}"]));
        let generation = ctx.generate("llama3.2:3b", "hello").unwrap();
        assert_eq!(generation.content, br#"{"response":"hi"}"#.to_vec());
        assert_eq!(generation.status_code, 200);
        assert_eq!(generation.size, 17);
        assert!(generation.time >= 0.0);
    }

    #[test]
    fn empty_reply_is_distinct_from_failure() {
        let ctx = context(
            FakeTransport::new()
                .reply(200, Vec::<Vec<u8>>::new())
                .fail(TransportError::Connect {
                    endpoint: "localhost:11441".to_string(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                }),
        );

        let empty = ctx.generate("m", "hi").unwrap();
        assert_eq!(empty.size, 0);
        assert_eq!(empty.status_code, 200);

        let err = ctx.generate("m", "hi").unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
    }
}
