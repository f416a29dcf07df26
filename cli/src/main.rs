//! Standalone command-line client: sends one prompt and prints the raw reply.
//!
//! Exit status is 0 only for a 200 reply. Every failure prints a diagnostic
//! to stderr and leaves stdout empty.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use ollama_bridge_core::transport::{self, Transport};
use ollama_bridge_core::{Backend, BridgeConfig, BridgeError, ChatClient};

#[derive(Parser, Debug)]
#[command(name = "ollama-bridge", version, about = "Send one prompt to a local inference server")]
struct Cli {
    /// Model identifier, e.g. llama3.2:3b
    model: String,

    /// Prompt text
    prompt: String,

    /// Server host (overrides OLLAMA_BRIDGE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides OLLAMA_BRIDGE_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// HTTP backend: native or portable (overrides OLLAMA_BRIDGE_BACKEND)
    #[arg(long)]
    backend: Option<Backend>,
}

impl Cli {
    fn config(&self) -> Result<BridgeConfig, BridgeError> {
        let mut config = BridgeConfig::from_env()?;
        if let Some(host) = &self.host {
            config.endpoint.host = host.clone();
        }
        if let Some(port) = self.port {
            config.endpoint.port = port;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        Ok(config)
    }
}

/// Send one request and report the outcome. Returns the exit code.
fn run<O, E>(
    transport: &dyn Transport,
    client: &ChatClient,
    model: &str,
    prompt: &str,
    out: &mut O,
    err: &mut E,
) -> u8
where
    O: Write,
    E: Write,
{
    let response = match client.send(transport, model, prompt) {
        Ok(response) => response,
        Err(e) => {
            let _ = writeln!(err, "Error: {e}");
            return 1;
        }
    };
    debug!(
        "status {} size {} in {:.3}s",
        response.status_code(),
        response.response_size(),
        response.elapsed_seconds()
    );

    if !response.is_success() {
        let _ = writeln!(err, "Error: server returned HTTP {}", response.status_code());
        return 1;
    }

    if let Err(e) = out.write_all(response.content()).and_then(|()| out.flush()) {
        let _ = writeln!(err, "Error: writing response: {e}");
        return 1;
    }
    0
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    let transport = transport::for_backend(config.backend, config.endpoint.clone());
    let client = ChatClient::new(&config);
    let code = run(
        transport.as_ref(),
        &client,
        &cli.model,
        &cli.prompt,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    ExitCode::from(code)
}
