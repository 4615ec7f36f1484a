//! ---
//! jsm_section: "05-external-interfaces"
//! jsm_subsection: "binary"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Line-delimited JSON request loop."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use crate::session::Session;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Simulated seconds that pass between two requests.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    tick: f32,

    /// Initial readings as CURRENT,VOLTAGE,FREQUENCY,POWER_FACTOR.
    #[arg(long, value_name = "A,V,HZ,PF", value_delimiter = ',')]
    readings: Option<Vec<f32>>,
}

/// Answer every non-empty stdin line until end of input.
pub fn run(session: &Session, args: ServeArgs) -> Result<()> {
    let mut translator = session.translator()?;
    match args.readings.as_deref() {
        Some(&[current, voltage, frequency, power_factor]) => translator
            .driver_mut()
            .set_readings(current, voltage, frequency, power_factor),
        Some(other) => bail!("--readings expects 4 values, got {}", other.len()),
        None => {}
    }
    info!(tick = args.tick, "serving requests from stdin");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut handled = 0_u64;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read request from stdin")?;
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        translator.driver_mut().advance(args.tick);
        let response = translator.handle_json(request.as_bytes());
        handled += 1;
        if response.is_empty() {
            continue;
        }
        out.write_all(&response)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush())
            .context("failed to write response to stdout")?;
    }
    info!(requests = handled, "stdin closed");
    Ok(())
}
