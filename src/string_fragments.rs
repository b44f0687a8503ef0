//! Strings longer than one entry payload are stored as a run of
//! consecutive `DynamicStringFragment` entries, 8 bytes each.

use crate::entry::{ProfileBufferEntry, PAYLOAD_SIZE};
use crate::frame::FrameFlags;

/// Split `s` into fragment entries. The last fragment is NUL padded.
pub fn fragments_for_string(s: &str) -> impl Iterator<Item = ProfileBufferEntry> + '_ {
    s.as_bytes().chunks(PAYLOAD_SIZE).map(|chunk| {
        let mut chars = [0u8; PAYLOAD_SIZE];
        chars[..chunk.len()].copy_from_slice(chunk);
        ProfileBufferEntry::DynamicStringFragment(chars)
    })
}

/// The entries for a label frame: `Label(len)`, `FrameFlags`, then the
/// fragments of the label text.
pub fn label_entries(label: &str, flags: FrameFlags) -> Vec<ProfileBufferEntry> {
    let mut entries = vec![
        ProfileBufferEntry::Label(label.len() as u64),
        ProfileBufferEntry::FrameFlags(flags.bits()),
    ];
    entries.extend(fragments_for_string(label));
    entries
}

const MAX_PREALLOCATED_LEN: usize = PAYLOAD_SIZE * 64;

/// Reassembles a string from fragment payloads, in buffer order.
///
/// With a known length, exactly that many bytes are taken. Without one,
/// bytes are taken up to the first NUL.
#[derive(Debug, Clone, Default)]
pub struct DynamicStringBuilder {
    expected_len: Option<usize>,
    bytes: Vec<u8>,
    terminated: bool,
}

impl DynamicStringBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// `len` comes from the buffer and may be larger than the fragments
    /// that actually follow, so it only bounds the result.
    pub fn with_len(len: usize) -> Self {
        Self {
            expected_len: Some(len),
            bytes: Vec::with_capacity(len.min(MAX_PREALLOCATED_LEN)),
            terminated: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self.expected_len {
            Some(len) => self.bytes.len() >= len,
            None => self.terminated,
        }
    }

    /// Returns whether the string is complete after this fragment.
    pub fn push_fragment(&mut self, chars: &[u8; PAYLOAD_SIZE]) -> bool {
        if self.is_complete() {
            return true;
        }
        match self.expected_len {
            Some(len) => {
                let remaining = len - self.bytes.len();
                self.bytes
                    .extend_from_slice(&chars[..remaining.min(PAYLOAD_SIZE)]);
            }
            None => match chars.iter().position(|&c| c == 0) {
                Some(nul) => {
                    self.bytes.extend_from_slice(&chars[..nul]);
                    self.terminated = true;
                }
                None => self.bytes.extend_from_slice(chars),
            },
        }
        self.is_complete()
    }

    pub fn finish(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Collect a string from the leading fragment entries of `entries`.
/// Stops at the first non-fragment entry.
pub fn string_from_fragments<'a>(
    len: Option<usize>,
    entries: impl IntoIterator<Item = &'a ProfileBufferEntry>,
) -> String {
    let mut builder = match len {
        Some(len) => DynamicStringBuilder::with_len(len),
        None => DynamicStringBuilder::new(),
    };
    for entry in entries {
        let ProfileBufferEntry::DynamicStringFragment(chars) = entry else {
            break;
        };
        if builder.push_fragment(chars) {
            break;
        }
    }
    builder.finish()
}
