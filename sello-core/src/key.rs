//! Keyed bin-pair selection for the carrier capability.
//!
//! AES-128 acts as a deterministic pseudo-random stream: the set of
//! frequency-bin pairs adjusted for a given analysis frame and channel is a
//! pure function of (key, frame index, channel index). Without the key the
//! adjusted pairs are indistinguishable from any other bins.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};

#[derive(Clone)]
pub struct CarrierKey {
    cipher: Aes128,
    raw: [u8; 16],
}

impl CarrierKey {
    pub fn new(key_bytes: [u8; 16]) -> Self {
        let cipher = Aes128::new_from_slice(&key_bytes).expect("AES-128 key is 16 bytes");
        Self {
            cipher,
            raw: key_bytes,
        }
    }

    /// Derive a key from a passphrase.
    ///
    /// Bytes are folded into a 16-byte digest with rotate/multiply mixing,
    /// then passed once through AES for avalanche.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut digest = [0u8; 16];
        for (i, b) in passphrase.bytes().enumerate() {
            let slot = i % 16;
            digest[slot] = digest[slot].rotate_left(3) ^ b;
            digest[(slot * 5 + 11) % 16] = digest[(slot * 5 + 11) % 16].wrapping_add(b ^ 0xA5);
        }
        let cipher = Aes128::new_from_slice(&digest).expect("digest is 16 bytes");
        let mut block = aes::Block::from(digest);
        cipher.encrypt_block(&mut block);
        Self::new(block.into())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.raw
    }

    /// Adjacent-bin pairs for one (frame, channel) slot.
    ///
    /// Each pair is `(center, center + 1)` with a key-decided orientation;
    /// adjacent pairing keeps the paired magnitudes close for smooth
    /// spectra, which is what makes the patchwork statistic sensitive.
    /// All pairs lie inside `[min_bin, max_bin)`.
    pub fn bin_pairs(
        &self,
        frame_index: u32,
        channel: u32,
        num_pairs: usize,
        min_bin: usize,
        max_bin: usize,
    ) -> Vec<(usize, usize)> {
        if max_bin <= min_bin + 1 {
            return Vec::new();
        }
        let center_range = max_bin - min_bin - 1;

        let mut pairs = Vec::with_capacity(num_pairs);
        let mut counter: u32 = 0;
        while pairs.len() < num_pairs {
            let mut input = [0u8; 16];
            input[0..4].copy_from_slice(&frame_index.to_le_bytes());
            input[4..8].copy_from_slice(&channel.to_le_bytes());
            input[8..12].copy_from_slice(&counter.to_le_bytes());

            let mut block = aes::Block::from(input);
            self.cipher.encrypt_block(&mut block);
            let output: [u8; 16] = block.into();

            // 3 bytes per pair: 2 for the center bin, 1 for orientation
            for chunk in output.chunks_exact(3) {
                if pairs.len() >= num_pairs {
                    break;
                }
                let center =
                    (u16::from_le_bytes([chunk[0], chunk[1]]) as usize) % center_range + min_bin;
                if chunk[2] & 1 == 1 {
                    pairs.push((center + 1, center));
                } else {
                    pairs.push((center, center + 1));
                }
            }
            counter += 1;
        }

        pairs
    }
}

impl std::fmt::Debug for CarrierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierKey").field("raw", &"[REDACTED]").finish()
    }
}
