//! File upload over the script channel.
//!
//! Flow: break → open → N × `f:write("…")` → close
//!
//! Each step is a script ending in `print(nil)` and is sent with
//! `await_reply`, so the device acknowledges every chunk before the next
//! one goes out. Chunk boundaries come from [`split_text`], which keeps
//! escape pairs intact.

use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::link::handlers::Handlers;
use crate::link::session::Session;
use crate::link::text::{escape_script_string, split_text};
use crate::link::transport::Transport;

/// Device-side path used when none is given.
pub const DEFAULT_DEVICE_PATH: &str = "main.lua";

/// Script that opens `device_path` for writing on the device.
pub fn open_script(device_path: &str) -> String {
    format!(
        "f=frame.file.open('{}','w');print(nil)",
        escape_script_string(device_path)
    )
}

/// Script that appends one already-escaped chunk to the open file.
pub fn write_script(escaped_chunk: &str) -> String {
    format!("f:write(\"{escaped_chunk}\");print(nil)")
}

pub const CLOSE_SCRIPT: &str = "f:close();print(nil)";

impl<T: Transport, H: Handlers> Session<T, H> {
    /// Write `content` to `device_path` on the device, replacing any existing file.
    pub async fn upload_file_from_string(&mut self, content: &str, device_path: &str) -> Result<()> {
        let timeout = self.config().reply_timeout();
        let chunk_size = self
            .max_script_payload()
            .checked_sub(self.config().upload_overhead)
            .filter(|&n| n >= 2)
            .ok_or(if self.is_connected() {
                Error::Configuration("MTU too small for upload chunks")
            } else {
                Error::NotConnected
            })?;

        let open = open_script(device_path);
        let max = self.max_script_payload();
        for script in [open.as_str(), CLOSE_SCRIPT] {
            if script.len() > max {
                return Err(Error::PayloadTooLarge {
                    len: script.len(),
                    max,
                });
            }
        }

        let escaped = escape_script_string(content);
        let chunks = split_text(&escaped, chunk_size)?;
        info!(
            "Upload: {} ({} bytes escaped, {} chunks)",
            device_path,
            escaped.len(),
            chunks.len()
        );

        self.send_break_signal().await?;
        self.send_script(&open, true, timeout).await?;

        for (i, chunk) in chunks.iter().enumerate() {
            debug!("Upload: chunk {}/{}", i + 1, chunks.len());
            self.send_script(&write_script(chunk), true, timeout)
                .await?;
        }

        self.send_script(CLOSE_SCRIPT, true, timeout).await?;
        info!("Upload: {} done", device_path);
        Ok(())
    }

    /// Upload a local file. Fails with [`Error::Io`] if it cannot be read.
    pub async fn upload_file(
        &mut self,
        local_path: impl AsRef<Path>,
        device_path: &str,
    ) -> Result<()> {
        let content = std::fs::read_to_string(local_path)?;
        self.upload_file_from_string(&content, device_path).await
    }
}
