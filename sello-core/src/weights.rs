//! Versioned weight artifact for the bundled carrier capability.
//!
//! The artifact is a small binary blob loaded once at process start. A
//! missing, truncated, or mismatched file is fatal: without it no session
//! can be constructed and no request is served.
//!
//! Layout (little endian):
//!
//! ```text
//! magic      8 bytes  "SELLOWM1"
//! version    u16
//! bits       u16      message width the capability was built for
//! rate       u32      canonical sample rate
//! key        16 bytes carrier key material
//! strength   f32      bin-pair magnitude adjustment
//! gain       f32      statistic-to-logit scale
//! bias       f32      presence statistic offset
//! ```

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::key::CarrierKey;

const MAGIC: &[u8; 8] = b"SELLOWM1";
const FORMAT_VERSION: u16 = 1;
const ARTIFACT_LEN: usize = 44;

#[derive(Debug, Clone)]
pub struct WeightArtifact {
    pub message_bits: u16,
    pub sample_rate: u32,
    pub key: [u8; 16],
    pub strength: f32,
    pub logit_gain: f32,
    pub logit_bias: f32,
}

impl WeightArtifact {
    /// Derive an artifact from a passphrase.
    ///
    /// The logit mapping is centered between the clean and watermarked
    /// operating points of the carrier statistic, so the gain and bias
    /// follow from the strength.
    pub fn from_passphrase(
        passphrase: &str,
        message_bits: u16,
        sample_rate: u32,
        strength: f32,
    ) -> Self {
        Self {
            message_bits,
            sample_rate,
            key: *CarrierKey::from_passphrase(passphrase).as_bytes(),
            strength,
            logit_gain: 8.0 / strength,
            logit_bias: strength / 2.0,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| Error::WeightsIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ARTIFACT_LEN {
            return Err(Error::WeightsFormat(format!(
                "artifact truncated: {} bytes, expected {ARTIFACT_LEN}",
                bytes.len()
            )));
        }
        if &bytes[..8] != MAGIC {
            return Err(Error::WeightsFormat("unrecognized magic".into()));
        }
        let version = u16::from_le_bytes([bytes[8], bytes[9]]);
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedWeightsVersion {
                got: version,
                supported: FORMAT_VERSION,
            });
        }

        let message_bits = u16::from_le_bytes([bytes[10], bytes[11]]);
        let sample_rate = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let mut key = [0u8; 16];
        key.copy_from_slice(&bytes[16..32]);
        let strength = f32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);
        let logit_gain = f32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]);
        let logit_bias = f32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);

        if sample_rate == 0 {
            return Err(Error::WeightsFormat("sample rate is zero".into()));
        }
        if !(strength.is_finite() && logit_gain.is_finite() && logit_bias.is_finite()) {
            return Err(Error::WeightsFormat("non-finite carrier parameters".into()));
        }

        Ok(Self {
            message_bits,
            sample_rate,
            key,
            strength,
            logit_gain,
            logit_bias,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ARTIFACT_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&self.message_bits.to_le_bytes());
        bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
        bytes.extend_from_slice(&self.key);
        bytes.extend_from_slice(&self.strength.to_le_bytes());
        bytes.extend_from_slice(&self.logit_gain.to_le_bytes());
        bytes.extend_from_slice(&self.logit_bias.to_le_bytes());
        bytes
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()).map_err(|source| Error::WeightsIo {
            path: path.to_path_buf(),
            source,
        })
    }
}
