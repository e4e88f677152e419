//! Per-window payload sampling.
//!
//! Every window receives one independently sampled message; no state is
//! shared across windows. The random source is an explicit dependency so
//! embedding can be made reproducible by seeding.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// A watermark payload carried by a single window.
pub type Message = u64;

/// Widest supported message space, in bits.
pub const MAX_MESSAGE_BITS: u32 = 32;

/// Uniform message source for embedding.
pub struct MessageSampler {
    rng: StdRng,
}

impl MessageSampler {
    /// Sampler seeded from OS entropy; every embed is independent.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sampler for reproducible embedding.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `count` independent messages uniformly from `[0, 2^message_bits)`.
    ///
    /// A width of zero degenerates to "no payload" mode: every draw is 0 and
    /// the generator is expected to ignore the message.
    pub fn sample(&mut self, count: usize, message_bits: u32) -> Result<Vec<Message>> {
        if message_bits > MAX_MESSAGE_BITS {
            return Err(Error::InvalidMessageBits {
                got: message_bits,
                max: MAX_MESSAGE_BITS,
            });
        }
        if message_bits == 0 {
            return Ok(vec![0; count]);
        }
        let space = 1u64 << message_bits;
        Ok((0..count).map(|_| self.rng.random_range(0..space)).collect())
    }
}
