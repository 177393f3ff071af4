// SPDX-License-Identifier: Apache-2.0

//! ADC FIFO to memory block transfers on DMA channel 0.

use cortex_m::singleton;
use rp2040_hal::{
    adc::{AdcFifo, DmaReadTarget},
    dma::{single_buffer, Channel, CH0},
    Timer,
};

use crate::{
    acquisition::{BlockTransfer, Clock},
    config::BLOCK_SAMPLES,
    Instant,
};

/// Destination of every block transfer
pub type BlockBuffer = &'static mut [u16; BLOCK_SAMPLES];

/// Transfer in flight. Owns the channel and the buffer until [`single_buffer::Transfer::wait`].
pub type AdcTransfer = single_buffer::Transfer<Channel<CH0>, DmaReadTarget<u16>, BlockBuffer>;

/// DMA channel and buffer at rest
pub struct Block {
    /// Channel 0, with IRQ0 enabled
    channel: Channel<CH0>,
    /// Last filled block
    buffer: BlockBuffer,
}

impl Block {
    /// Pair a channel with its destination buffer
    pub fn new(channel: Channel<CH0>, buffer: BlockBuffer) -> Self {
        Self { channel, buffer }
    }
}

impl AsRef<[u16]> for Block {
    fn as_ref(&self) -> &[u16] {
        &self.buffer[..]
    }
}

/// Temperature sensor FIFO, paused between blocks
pub struct AdcDmaBlocks {
    /// FIFO on ADC input 4 with DREQ enabled
    fifo: AdcFifo<'static, u16>,
}

impl AdcDmaBlocks {
    /// Take over a FIFO built with `enable_dma()` and `start_paused()`
    pub fn new(fifo: AdcFifo<'static, u16>) -> Self {
        Self { fifo }
    }
}

impl BlockTransfer for AdcDmaBlocks {
    type Idle = Block;
    type InFlight = AdcTransfer;

    fn start(&mut self, block: Block) -> AdcTransfer {
        // Drop stale conversions so the block starts with fresh samples
        self.fifo.clear();
        let transfer =
            single_buffer::Config::new(block.channel, self.fifo.dma_read_target(), block.buffer)
                .start();
        self.fifo.resume();
        transfer
    }

    fn finish(&mut self, transfer: AdcTransfer) -> Block {
        self.fifo.pause();
        // Completion was already signalled, so this returns at once
        let (channel, _, buffer) = transfer.wait();
        Block { channel, buffer }
    }
}

impl Clock for Timer {
    fn now(&self) -> Instant {
        self.get_counter()
    }
}

/// Creates the buffer for ADC DMA transfers
pub fn create_block_buffer() -> Option<BlockBuffer> {
    singleton!(: [u16; BLOCK_SAMPLES] = [0u16; BLOCK_SAMPLES])
}
