//! Terminal output helpers shared by the commands.

use std::time::Duration;

use grabdrop_core::dispatch::Signal;

/// Parse a human duration such as `500ms`, `3s`, `2m` or `1h`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3600)
    } else {
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier).map(Duration::from_secs)
}

/// One-line human description of a dispatcher signal.
pub fn describe_signal(signal: &Signal) -> String {
    match signal {
        Signal::CaptureSucceeded { kind, locator } => format!("Grabbed {kind}: {locator}"),
        Signal::CaptureEmpty => "Nothing on the clipboard to grab".to_string(),
        Signal::CaptureFailed { reason } => format!("Could not grab the clipboard: {reason}"),
        Signal::NoDeviceAvailable => "No devices available".to_string(),
        Signal::NoTargetInRegion => "No device in that direction".to_string(),
        Signal::TransferStarted {
            peer, file_name, ..
        } => format!("Sending {file_name} to {peer}..."),
        Signal::TransferSucceeded { peer, message, .. } => format!("[{peer}] {message}"),
        Signal::TransferFailed { peer, message, .. } => format!("[{peer}] failed: {message}"),
    }
}

/// Print a signal either as a JSON line or as human text.
pub fn print_signal(signal: &Signal, json: bool) {
    if json {
        match serde_json::to_string(signal) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Failed to encode signal: {e}"),
        }
    } else {
        println!("  {}", describe_signal(signal));
    }
}

/// Truncate a string to at most `max_len` characters, ending in `...`.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
