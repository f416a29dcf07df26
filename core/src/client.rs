//! Request assembly and dispatch for the chat endpoint.
//!
//! # Design
//! `ChatClient` holds only the size limits and carries no mutable state
//! between calls. `build_request` validates arguments and produces the JSON
//! body without touching the network; `send` hands that body to any
//! `Transport`. Nothing is sent when validation or assembly fails.

use log::debug;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::http::HttpResponse;
use crate::payload::{build_chat_request, escape};
use crate::transport::Transport;

/// Stateless builder and sender of chat requests.
#[derive(Debug, Clone)]
pub struct ChatClient {
    max_model_bytes: usize,
    max_prompt_bytes: usize,
    max_request_bytes: usize,
}

impl ChatClient {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            max_model_bytes: config.max_model_bytes,
            max_prompt_bytes: config.max_prompt_bytes,
            max_request_bytes: config.max_request_bytes,
        }
    }

    /// Validate `model` and `prompt` and assemble the request body.
    pub fn build_request(&self, model: &str, prompt: &str) -> Result<String, BridgeError> {
        if model.is_empty() {
            return Err(BridgeError::InvalidArgument("model must not be empty".to_string()));
        }
        check_len("model", model, self.max_model_bytes)?;
        check_len("prompt", prompt, self.max_prompt_bytes)?;

        let body = build_chat_request(model, &escape(prompt), self.max_request_bytes)?;
        Ok(body)
    }

    /// Build the request and post it through `transport`.
    ///
    /// A non-200 reply is returned as `Ok`; inspect `status_code`.
    pub fn send<T>(&self, transport: &T, model: &str, prompt: &str) -> Result<HttpResponse, BridgeError>
    where
        T: Transport + ?Sized,
    {
        let body = self.build_request(model, prompt)?;
        debug!("sending {} byte chat request for model {model}", body.len());
        let response = transport.post(body.as_bytes())?;
        Ok(response)
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

fn check_len(name: &'static str, value: &str, limit: usize) -> Result<(), BridgeError> {
    if value.len() > limit {
        return Err(BridgeError::ArgumentTooLong {
            name,
            len: value.len(),
            limit,
        });
    }
    Ok(())
}
