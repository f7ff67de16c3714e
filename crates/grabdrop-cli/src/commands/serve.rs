//! Serve command implementation.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use grabdrop_core::config::Config;
use grabdrop_core::discovery::mdns::{AnnounceProperties, MdnsAnnouncer};
use grabdrop_core::receiver::ReceiveServer;

use super::NodeArgs;

/// Apply command-line overrides to the loaded configuration.
pub(super) fn apply_overrides(config: &mut Config, args: &NodeArgs) {
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(name) = &args.name {
        config.general.device_name.clone_from(name);
    }
    if let Some(output) = &args.output {
        config.receive.upload_dir.clone_from(output);
    }
}

/// A running receiver, optionally announced over mDNS.
pub(super) struct Node {
    pub addr: SocketAddr,
    pub device_id: Uuid,
    announcer: Option<MdnsAnnouncer>,
    server: JoinHandle<grabdrop_core::Result<()>>,
    shutdown: CancellationToken,
}

impl Node {
    /// Bind the receiver and announce it unless `announce` is false.
    ///
    /// Failing to announce is not fatal: the receiver still works for
    /// senders that know its address.
    pub async fn start(config: &Config, announce: bool) -> Result<Self> {
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.network.port));
        let server = ReceiveServer::bind(bind_addr, &config.receive)
            .await
            .context("Failed to start receiver")?;
        let addr = server.local_addr()?;
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(server.serve(shutdown.clone()));

        let device_id = Uuid::new_v4();
        let announcer = if announce {
            let properties = AnnounceProperties {
                device_name: config.general.device_name.clone(),
                device_id,
                port: addr.port(),
                version: grabdrop_core::SERVICE_VERSION.to_string(),
            };
            match MdnsAnnouncer::new().and_then(|a| a.register(&properties).map(|()| a)) {
                Ok(announcer) => Some(announcer),
                Err(e) => {
                    tracing::warn!("Not announcing on the network: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            addr,
            device_id,
            announcer,
            server,
            shutdown,
        })
    }

    /// Whether other devices can find this node over mDNS.
    pub fn is_announced(&self) -> bool {
        self.announcer.is_some()
    }

    /// Withdraw the announcement and stop the receiver.
    pub async fn stop(self) -> Result<()> {
        if let Some(announcer) = self.announcer {
            if let Err(e) = announcer.shutdown() {
                tracing::debug!("mDNS shutdown: {e}");
            }
        }
        self.shutdown.cancel();
        self.server.await.context("Receiver task panicked")??;
        Ok(())
    }
}

/// Print where this node listens and stores files.
pub(super) fn print_node(config: &Config, node: &Node) {
    println!("  Device:   {}", config.general.device_name);
    println!("  Receiver: port {}", node.addr.port());
    println!("  Saving:   {}", config.receive.upload_dir.display());
    if !node.is_announced() {
        println!("  (not announced; other devices must send to this address directly)");
    }
}

/// Run the serve command.
pub async fn run(args: super::ServeArgs) -> Result<()> {
    let mut config = super::load_config();
    apply_overrides(&mut config, &args.node);

    let node = Node::start(&config, !args.node.no_announce).await?;

    println!();
    println!("Grabdrop - Receiving");
    println!("{}", "─".repeat(60));
    print_node(&config, &node);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!("Stopping...");
    node.stop().await
}
