//! Recording register doubles used by the controller tests.

use std::collections::VecDeque;

use crate::bus::RegisterBlock;
use crate::register::{resets, ssp};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Write {
    pub offset: usize,
    pub value: u32,
    pub mask: u32,
}

/// Behaves like an SSP block whose wire answers every transmitted word with
/// the next entry of `replies`.
#[derive(Debug, Default)]
pub struct FakeSsp {
    registers: [u32; 16],
    rx_fifo: VecDeque<u16>,
    pub replies: VecDeque<u16>,
    pub sent: Vec<u16>,
    pub writes: Vec<Write>,
    pub reads: usize,
    /// Neither FIFO ever becomes ready.
    pub stalled: bool,
}

impl FakeSsp {
    pub fn with_replies(replies: &[u16]) -> Self {
        Self {
            replies: replies.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queues words in the receive FIFO as if a previous exchange had been
    /// abandoned before draining it.
    pub fn leave_unread(&mut self, words: &[u16]) {
        self.rx_fifo.extend(words);
    }

    pub fn register(&self, offset: usize) -> u32 {
        self.registers[offset / 4]
    }

    pub fn touched(&self) -> bool {
        self.reads != 0 || !self.writes.is_empty()
    }
}

impl RegisterBlock for FakeSsp {
    fn read_masked(&mut self, offset: usize, mask: u32) -> u32 {
        self.reads += 1;
        let value = match offset {
            ssp::DR => u32::from(self.rx_fifo.pop_front().unwrap_or(0)),
            ssp::SR if self.stalled => ssp::sr::BSY_BITS,
            ssp::SR => {
                let mut status = ssp::sr::TNF_BITS;
                if !self.rx_fifo.is_empty() {
                    status |= ssp::sr::RNE_BITS;
                }
                status
            }
            _ => self.registers[offset / 4],
        };
        value & mask
    }

    fn write_masked(&mut self, offset: usize, value: u32, mask: u32) {
        self.writes.push(Write {
            offset,
            value,
            mask,
        });
        if offset == ssp::DR {
            assert_eq!(mask, u32::MAX, "data register written with a partial mask");
            assert!(self.rx_fifo.len() < ssp::FIFO_DEPTH, "receive FIFO overrun");
            self.sent.push(value as u16);
            let reply = self.replies.pop_front().unwrap_or(0);
            self.rx_fifo.push_back(reply);
        } else {
            let register = &mut self.registers[offset / 4];
            *register = (*register & !mask) | (value & mask);
        }
    }
}

/// Reset controller whose blocks come out of reset immediately, unless
/// `stuck` is set.
#[derive(Debug, Default)]
pub struct FakeResets {
    reset: u32,
    pub writes: Vec<Write>,
    pub reads: usize,
    pub stuck: bool,
}

impl FakeResets {
    pub fn stuck() -> Self {
        Self {
            stuck: true,
            ..Self::default()
        }
    }

    pub fn touched(&self) -> bool {
        self.reads != 0 || !self.writes.is_empty()
    }
}

impl RegisterBlock for FakeResets {
    fn read_masked(&mut self, offset: usize, mask: u32) -> u32 {
        self.reads += 1;
        match offset {
            resets::RESET => self.reset & mask,
            resets::RESET_DONE if self.stuck => 0,
            resets::RESET_DONE => !self.reset & mask,
            _ => 0,
        }
    }

    fn write_masked(&mut self, offset: usize, value: u32, mask: u32) {
        self.writes.push(Write {
            offset,
            value,
            mask,
        });
        if offset == resets::RESET {
            self.reset = (self.reset & !mask) | (value & mask);
        }
    }
}
