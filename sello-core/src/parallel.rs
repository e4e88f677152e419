//! Optional parallel batch processing using rayon.
//!
//! Enable with the `parallel` feature flag. Items within a batch share no
//! mutable state, so they fan out across a thread pool; each item's window
//! loop stays sequential. Results keep the input order of the processed
//! items, with skipped items absent as in the sequential path.

use rayon::prelude::*;
use tracing::debug;

use crate::batch::{AudioDecoder, BatchInput, DetectedItem, EmbeddedItem, ItemOutcome, embed_one};
use crate::error::{Error, Result};
use crate::message::MessageSampler;
use crate::model::InferenceSession;

/// Embed a batch with one rayon task per item.
///
/// With `base_seed` set, item `i` samples its messages from `base_seed + i`,
/// making the whole batch reproducible regardless of scheduling; without
/// it, every item draws fresh OS entropy.
pub fn embed_batch_parallel<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    items: &[BatchInput],
    message_bits: u32,
    base_seed: Option<u64>,
) -> Result<Vec<EmbeddedItem>> {
    if message_bits > session.message_bits() {
        return Err(Error::InvalidMessageBits {
            got: message_bits,
            max: session.message_bits(),
        });
    }

    let outcomes: Vec<Result<ItemOutcome<EmbeddedItem>>> = items
        .par_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut sampler = match base_seed {
                Some(seed) => MessageSampler::seeded(seed.wrapping_add(i as u64)),
                None => MessageSampler::from_entropy(),
            };
            embed_one(decoder, session, item, message_bits, &mut sampler)
        })
        .collect();

    collect_processed(outcomes)
}

/// Score a batch with one rayon task per item.
pub fn detect_batch_parallel<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    items: &[BatchInput],
    threshold: f32,
) -> Result<Vec<DetectedItem>> {
    let outcomes: Vec<Result<ItemOutcome<DetectedItem>>> = items
        .par_iter()
        .map(|item| crate::batch::detect_one(decoder, session, item, threshold))
        .collect();

    collect_processed(outcomes)
}

fn collect_processed<T>(outcomes: Vec<Result<ItemOutcome<T>>>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome? {
            ItemOutcome::Processed(done) => results.push(done),
            ItemOutcome::Skipped { name, reason } => {
                debug!(item = %name, ?reason, "skipping batch item");
            }
        }
    }
    Ok(results)
}
