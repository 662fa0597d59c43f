//! Button stimulus recording and replay.
//!
//! Captures the exact simulation cycle at which each button press/release
//! reached the circuit, so an interactive session can be replayed
//! deterministically against the same model — the replayed run steps the
//! same pin values on the same cycles and therefore reconstructs the same
//! frames.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "VSTM"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode Vec<ButtonEvent>
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Button;

/// Magic bytes identifying a vgasim stimulus file.
const MAGIC: &[u8; 4] = b"VSTM";
/// Current stimulus format version.
const FORMAT_VERSION: u32 = 1;

/// One button transition, stamped with the cycle it applies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub cycle: u64,
    pub button: Button,
    pub pressed: bool,
}

/// Serialize events to the stimulus file format.
pub fn encode(events: &[ButtonEvent]) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(events).map_err(|e| format!("Serialize error: {}", e))?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Deserialize events from the stimulus file format, verifying magic and
/// version.
pub fn decode(data: &[u8]) -> Result<Vec<ButtonEvent>, String> {
    if data.len() < 8 {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid stimulus file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!(
            "Unsupported stimulus version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }
    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[8..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;
    bincode::deserialize(&decompressed).map_err(|e| format!("Deserialize error: {}", e))
}

/// Accumulates button transitions during a live session.
#[derive(Default)]
pub struct Recorder {
    events: Vec<ButtonEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder { events: Vec::new() }
    }

    /// Record one transition at the given cycle.
    pub fn record(&mut self, cycle: u64, button: Button, pressed: bool) {
        self.events.push(ButtonEvent { cycle, button, pressed });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[ButtonEvent] {
        &self.events
    }

    /// Write the recorded stimulus to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        let data = encode(&self.events)?;
        std::fs::write(path, &data).map_err(|e| format!("Write error {}: {}", path.display(), e))
    }
}

/// Replays a recorded event stream in cycle order.
pub struct Player {
    events: Vec<ButtonEvent>,
    pos: usize,
}

impl Player {
    /// Build a player over an event list. Events are sorted by cycle; the
    /// recorder emits them in order already, but files are untrusted.
    pub fn new(mut events: Vec<ButtonEvent>) -> Self {
        events.sort_by_key(|e| e.cycle);
        Player { events, pos: 0 }
    }

    /// Read and decode a stimulus file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let data =
            std::fs::read(path).map_err(|e| format!("Read error {}: {}", path.display(), e))?;
        Ok(Self::new(decode(&data)?))
    }

    /// Next event due at or before `cycle`, if any. Call in a loop until it
    /// returns None to drain everything due.
    pub fn next_due(&mut self, cycle: u64) -> Option<ButtonEvent> {
        let event = *self.events.get(self.pos)?;
        if event.cycle <= cycle {
            self.pos += 1;
            Some(event)
        } else {
            None
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.pos
    }

    pub fn finished(&self) -> bool {
        self.pos == self.events.len()
    }
}
