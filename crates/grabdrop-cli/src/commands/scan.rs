//! Scan command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinSet;

use grabdrop_core::discovery::mdns::MdnsBrowser;
use grabdrop_core::discovery::{DeviceRegistry, Peer, RegistrySnapshot};
use grabdrop_core::transfer::{HttpTransport, TransferTransport};

use super::ScanArgs;
use crate::ui::{parse_duration, truncate_string};

/// Browse for `duration` and return what was found.
pub(super) async fn discover(duration: Duration) -> Result<RegistrySnapshot> {
    let registry = DeviceRegistry::new();
    let browser = MdnsBrowser::start(registry.clone(), None)
        .context("Failed to start device discovery")?;

    tokio::time::sleep(duration).await;

    let snapshot = registry.snapshot();
    if let Err(e) = browser.shutdown() {
        tracing::debug!("mDNS browser shutdown: {e}");
    }
    Ok(snapshot)
}

/// Ping every peer concurrently, keeping discovery order.
async fn check_reachable(peers: &[Peer], timeout: Duration) -> Vec<bool> {
    let transport = HttpTransport::new();
    let mut checks = JoinSet::new();
    for (index, peer) in peers.iter().enumerate() {
        let transport = transport.clone();
        let addr = peer.socket_addr();
        checks.spawn(async move { (index, transport.ping(addr, timeout).await) });
    }

    let mut reachable = vec![false; peers.len()];
    while let Some(result) = checks.join_next().await {
        if let Ok((index, ok)) = result {
            reachable[index] = ok;
        }
    }
    reachable
}

/// Run the scan command.
pub async fn run(args: ScanArgs) -> Result<()> {
    let config = super::load_config();

    let duration = parse_duration(&args.duration)
        .context("Invalid duration format. Use formats like '500ms', '3s', '1m'")?;

    if !args.json {
        println!();
        println!("Scanning for devices ({})...", args.duration);
        println!();
    }

    let snapshot = discover(duration).await?;
    let reachable = check_reachable(snapshot.peers(), config.network.ping_timeout).await;

    if args.json {
        output_json_peers(snapshot.peers(), &reachable)?;
    } else {
        display_peers(snapshot.peers(), &reachable);
    }

    Ok(())
}

/// Output peers as JSON.
fn output_json_peers(peers: &[Peer], reachable: &[bool]) -> Result<()> {
    let output = serde_json::json!({
        "devices": peers.iter().zip(reachable).map(|(p, ok)| serde_json::json!({
            "id": p.id,
            "name": p.name,
            "address": p.address.to_string(),
            "port": p.port,
            "last_seen": p.last_seen,
            "reachable": ok,
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Display peers as text table.
fn display_peers(peers: &[Peer], reachable: &[bool]) {
    println!("Devices on Network:");
    println!("{}", "─".repeat(60));
    println!("  {:24}  {:22}  {:9}", "Device", "Address", "Status");
    println!("{}", "─".repeat(60));

    if peers.is_empty() {
        println!("  (no devices found)");
        println!("{}", "─".repeat(60));
        return;
    }

    for (peer, ok) in peers.iter().zip(reachable) {
        println!(
            "  {:24}  {:22}  {:9}",
            truncate_string(&peer.name, 24),
            peer.socket_addr().to_string(),
            if *ok { "online" } else { "no answer" }
        );
    }

    println!("{}", "─".repeat(60));
}
