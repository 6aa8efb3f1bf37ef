//! Reassembly of edge events from an event fd byte stream.
//!
//! An event fd is read as a plain byte stream: one read may end halfway
//! through a record or carry several of them. Records are framed with a
//! fixed stride of [`EVENT_FRAME_SIZE`] bytes, the 12 meaningful bytes of
//! `gpioevent_data` followed by a 4 byte trailer.

use std::collections::VecDeque;

use crate::{codec::Record, uapi::layout::EVENT_FRAME_SIZE};

use super::LineEvent;

/// Turns arbitrarily chunked event fd reads into [`LineEvent`]s
///
/// The decoder holds the incomplete tail of the last chunk and the id of
/// the last frame seen. A frame whose id equals that of the frame before it
/// is dropped, so a run of frames with the same edge id yields only its
/// first event. The output does not depend on how the stream was chunked.
///
/// Note that this also collapses two genuine edges of the same kind with
/// no opposite edge in between, e.g. a missed falling edge on a bouncing
/// input shows up as a single rising event.
///
/// Each event fd gets its own decoder; nothing is shared between them.
#[derive(Debug, Clone, Default)]
pub struct EventStreamDecoder {
    carry: [u8; EVENT_FRAME_SIZE],
    carry_len: usize,
    last_id: Option<u32>,
    pending: VecDeque<LineEvent>,
}

impl EventStreamDecoder {
    pub const fn new() -> Self {
        Self {
            carry: [0; EVENT_FRAME_SIZE],
            carry_len: 0,
            last_id: None,
            pending: VecDeque::new(),
        }
    }

    /// Consume one chunk read from the event fd.
    ///
    /// Returns the number of events that became available.
    pub fn feed(&mut self, mut chunk: &[u8]) -> usize {
        let before = self.pending.len();

        if self.carry_len > 0 {
            let take = (EVENT_FRAME_SIZE - self.carry_len).min(chunk.len());
            self.carry[self.carry_len..self.carry_len + take].copy_from_slice(&chunk[..take]);
            self.carry_len += take;
            chunk = &chunk[take..];

            if self.carry_len < EVENT_FRAME_SIZE {
                return 0;
            }
            let frame = self.carry;
            self.carry_len = 0;
            self.push_frame(&frame);
        }

        let mut frames = chunk.chunks_exact(EVENT_FRAME_SIZE);
        for frame in frames.by_ref() {
            self.push_frame(frame);
        }

        let rest = frames.remainder();
        self.carry[..rest.len()].copy_from_slice(rest);
        self.carry_len = rest.len();

        self.pending.len() - before
    }

    fn push_frame(&mut self, frame: &[u8]) {
        // frames are always longer than the record they carry
        let Ok(event) = LineEvent::decode(frame) else {
            return;
        };

        if self.last_id != Some(event.id()) {
            self.pending.push_back(event);
        }
        self.last_id = Some(event.id());
    }

    /// Take the oldest decoded event, if any
    pub fn next_event(&mut self) -> Option<LineEvent> {
        self.pending.pop_front()
    }

    /// Number of decoded events not yet taken
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Bytes of an incomplete frame held over for the next chunk
    pub fn buffered_bytes(&self) -> usize {
        self.carry_len
    }

    /// Edge id of the last frame decoded, emitted or not
    pub fn last_id(&self) -> Option<u32> {
        self.last_id
    }

    pub fn drain(&mut self) -> impl Iterator<Item = LineEvent> + '_ {
        self.pending.drain(..)
    }
}
