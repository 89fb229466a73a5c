use munchbot_core::config::{AppConfig, LoadOptions};
use munchbot_workspace::{VerificationSigner, OUTBOUND_TOKEN_HEADER};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SignedChallenge<'a> {
    command: &'static str,
    status: &'static str,
    header: &'static str,
    token: String,
    body: String,
    challenge: &'a str,
}

pub fn run(challenge: &str) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => sign_with(&config, challenge),
        Err(error) => CommandResult::config_failure("sign", error),
    }
}

/// Same body and token the server returns for a `verification` event.
pub fn sign_with(config: &AppConfig, challenge: &str) -> CommandResult {
    let signer = VerificationSigner::new(config.workspace.webhook_secret.clone());
    let response = match signer.verification_response(challenge) {
        Ok(response) => response,
        Err(error) => return CommandResult::failure("sign", "signing", error.to_string(), 1),
    };

    let payload = SignedChallenge {
        command: "sign",
        status: "ok",
        header: OUTBOUND_TOKEN_HEADER,
        token: response.token,
        body: response.body,
        challenge,
    };
    match serde_json::to_string(&payload) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("sign", "serialization", error.to_string(), 1),
    }
}
