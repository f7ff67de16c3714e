//! Send command implementation.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};

use grabdrop_core::clipboard::{CapturedPayload, PayloadKind};
use grabdrop_core::transfer::{HttpTransport, TransferTransport};

use super::scan::discover;
use super::SendArgs;
use crate::ui::parse_duration;

/// Resolve `--to` into a receiver address, discovering devices if needed.
async fn resolve_target(to: Option<&str>, wait: &str) -> Result<(String, SocketAddr)> {
    if let Some(addr) = to.and_then(|t| t.parse::<SocketAddr>().ok()) {
        return Ok((addr.to_string(), addr));
    }

    let duration = parse_duration(wait)
        .context("Invalid duration format. Use formats like '500ms', '3s', '1m'")?;
    println!("Looking for devices ({wait})...");
    let snapshot = discover(duration).await?;

    let peer = match to {
        Some(name) => snapshot.find_by_name(name),
        None if snapshot.len() == 1 => snapshot.peers().first(),
        None if snapshot.is_empty() => bail!("No devices found"),
        None => {
            let names: Vec<_> = snapshot.peers().iter().map(|p| p.name.as_str()).collect();
            bail!(
                "Several devices found ({}); pick one with --to",
                names.join(", ")
            );
        }
    };

    match peer {
        Some(peer) => Ok((peer.name.clone(), peer.socket_addr())),
        None => bail!("Device '{}' not found", to.unwrap_or_default()),
    }
}

/// Run the send command.
pub async fn run(args: SendArgs) -> Result<()> {
    let config = super::load_config();

    if !args.file.is_file() {
        bail!("Not a file: {}", args.file.display());
    }
    let path = args
        .file
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.file.display()))?;

    let (label, addr) = resolve_target(args.to.as_deref(), &args.duration).await?;

    let payload = CapturedPayload::new(PayloadKind::File, path.to_string_lossy());
    println!("Sending {} to {label}...", payload.file_name());

    let outcome = HttpTransport::new()
        .send(&payload, addr, config.network.send_timeout)
        .await;

    if !outcome.ok {
        bail!("{}", outcome.message);
    }
    println!("  {}", outcome.message);
    Ok(())
}
