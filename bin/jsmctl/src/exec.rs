//! ---
//! jsm_section: "05-external-interfaces"
//! jsm_subsection: "binary"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "One-shot command execution."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use jsm_core::Command;
use serde_json::{json, Value};
use tracing::warn;

use crate::session::Session;

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Wire name of the command, e.g. `getMeasurementData`.
    name: String,

    /// Payload object for commands that carry one, e.g. `{"powerCut":true}`.
    #[arg(long, value_name = "JSON")]
    data: Option<String>,
}

/// Run one command through the out-of-band entry point and print the response.
pub fn run(session: &Session, args: ExecArgs) -> Result<()> {
    let cmd = Command::resolve(&args.name);
    if cmd == Command::Invalid {
        warn!(name = %args.name, "unknown command name");
    }
    let payload = match &args.data {
        Some(text) => {
            let data: Value = serde_json::from_str(text)
                .with_context(|| format!("--data is not valid JSON: {text}"))?;
            serde_json::to_vec(&json!({ "data": data }))?
        }
        None => Vec::new(),
    };
    if cmd.carries_payload() && payload.is_empty() {
        warn!(command = %cmd, "no --data given; the request will be rejected");
    }

    let mut translator = session.translator()?;
    let response = translator.handle(cmd, &payload);
    if response.is_empty() {
        return Ok(());
    }
    let mut out = io::stdout().lock();
    out.write_all(&response)?;
    out.write_all(b"\n")?;
    Ok(())
}
