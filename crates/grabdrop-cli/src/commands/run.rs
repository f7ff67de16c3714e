//! Run command implementation.
//!
//! Wires the receiver, discovery, the clipboard and the frame loop together.
//! The frame loop blocks on its input, so it gets a thread of its own while
//! transfers run on the tokio runtime.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use grabdrop_core::clipboard::NativeClipboardBridge;
use grabdrop_core::discovery::mdns::MdnsBrowser;
use grabdrop_core::discovery::DeviceRegistry;
use grabdrop_core::dispatch::{DispatchSettings, Signal, TransferDispatcher, TransferTask};
use grabdrop_core::gesture::JsonLinesClassifier;
use grabdrop_core::session::{FrameLoop, LoopStats};
use grabdrop_core::transfer::HttpTransport;

use super::serve::{apply_overrides, print_node, Node};
use crate::ui;

type Input = Box<dyn BufRead + Send>;

fn open_input(path: Option<&Path>) -> Result<Input> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Forward dispatcher signals to the terminal until the dispatcher is gone.
async fn print_signals(mut signals: broadcast::Receiver<Signal>, json: bool) {
    loop {
        match signals.recv().await {
            Ok(signal) => ui::print_signal(&signal, json),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!("Dropped {missed} signals");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Run the run command.
pub async fn run(args: super::RunArgs) -> Result<()> {
    let mut config = super::load_config();
    apply_overrides(&mut config, &args.node);
    let input = open_input(args.input.as_deref())?;

    let node = Node::start(&config, !args.node.no_announce).await?;

    let registry = DeviceRegistry::new();
    let browser = match MdnsBrowser::start(registry.clone(), Some(node.device_id)) {
        Ok(browser) => Some(browser),
        Err(e) => {
            tracing::warn!("Device discovery disabled: {e}");
            None
        }
    };

    let dispatcher = TransferDispatcher::new(
        registry,
        Arc::new(HttpTransport::new()),
        DispatchSettings::from_config(&config),
        Handle::current(),
    );
    let printer = tokio::spawn(print_signals(dispatcher.subscribe(), args.json));

    let clipboard = NativeClipboardBridge::new(
        config.clipboard.staging_dir(),
        config.clipboard.max_staged_age,
    );
    let mut frame_loop = FrameLoop::new(
        JsonLinesClassifier::new(input),
        clipboard,
        dispatcher,
        &config.gesture,
    );

    if !args.json {
        println!();
        println!("Grabdrop - Watching for gestures");
        println!("{}", "─".repeat(60));
        print_node(&config, &node);
        println!();
        println!("  Close your hand to grab, open it to throw. Ctrl+C to stop.");
        println!();
    }

    let cancel = CancellationToken::new();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<(
        grabdrop_core::Result<LoopStats>,
        Vec<TransferTask>,
    )>();
    let loop_cancel = cancel.clone();
    std::thread::Builder::new()
        .name("grabdrop-frames".to_string())
        .spawn(move || {
            let result = frame_loop.run(&loop_cancel);
            let tasks = frame_loop.dispatcher().tasks().to_vec();
            let _ = done_tx.send((result, tasks));
        })
        .context("Failed to start frame loop thread")?;

    // The frame thread may be stuck in a blocking read; on Ctrl+C it is
    // left behind and dies with the process.
    let finished = tokio::select! {
        done = done_rx => Some(done.context("Frame loop thread exited unexpectedly")?),
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            println!("Stopping...");
            None
        }
    };

    let mut result = Ok(());
    if let Some((stats, tasks)) = finished {
        match stats {
            Ok(stats) => {
                tracing::info!(
                    frames = stats.frames,
                    invalid = stats.invalid,
                    grabs = stats.grabs,
                    transfers = stats.transfers,
                    "Input finished"
                );
            }
            Err(e) => result = Err(e).context("Frame loop stopped"),
        }
        for task in tasks {
            task.finished().await;
        }
        // The dispatcher was dropped with the frame loop, closing the channel.
        let _ = printer.await;
    }

    if let Some(browser) = browser {
        if let Err(e) = browser.shutdown() {
            tracing::debug!("mDNS browser shutdown: {e}");
        }
    }
    node.stop().await?;
    result
}
