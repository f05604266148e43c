use sha2::{Digest, Sha256};

use switchyard_types::{DecodingParams, NormalizedMessage};

/// Feed a length-prefixed field so adjacent fields can never run together.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_optional_f64(hasher: &mut Sha256, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.to_bits().to_le_bytes());
        },
        None => hasher.update([0u8]),
    }
}

/// Deterministic digest of a normalized request.
///
/// Order-sensitive over messages. `use_cache` is a transport switch and does
/// not take part.
pub fn compute_fingerprint(
    messages: &[NormalizedMessage],
    model_id: &str,
    params: &DecodingParams,
) -> String {
    let mut hasher = Sha256::new();

    update_field(&mut hasher, model_id.as_bytes());

    hasher.update((messages.len() as u64).to_le_bytes());
    for message in messages {
        update_field(&mut hasher, message.role.as_str().as_bytes());
        update_field(&mut hasher, message.content.as_bytes());
    }

    match params.max_tokens {
        Some(max) => {
            hasher.update([1u8]);
            hasher.update(max.to_le_bytes());
        },
        None => hasher.update([0u8]),
    }
    update_optional_f64(&mut hasher, params.temperature);
    update_optional_f64(&mut hasher, params.top_p);

    hasher.update((params.stop.len() as u64).to_le_bytes());
    for stop in &params.stop {
        update_field(&mut hasher, stop.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}
