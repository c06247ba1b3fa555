//! Synthetic data for histogram and selection tests.
//!
//! Every generator is deterministic so failures are reproducible.

/// `0.0, 1.0, 2.0, ...`: each value equals its flat index.
pub fn index_values(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

pub fn constant_values(len: usize, value: f64) -> Vec<f64> {
    vec![value; len]
}

/// Precipitation-like values in mm/day.
///
/// Roughly half the samples are dry (0.0); the rest spread over 0-120.
pub fn precip_values(len: usize, seed: u32) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let hash = simple_hash(i as u32, seed);
            if hash % 2 == 0 {
                0.0
            } else {
                (hash % 12_000) as f64 / 100.0
            }
        })
        .collect()
}

/// Values loosely tracking `base`: `base * scale` plus bounded noise,
/// clamped at zero.
pub fn correlated_values(base: &[f64], scale: f64, seed: u32) -> Vec<f64> {
    base.iter()
        .enumerate()
        .map(|(i, &v)| {
            let noise = (simple_hash(i as u32, seed) % 1000) as f64 / 100.0 - 5.0;
            (v * scale + noise).max(0.0)
        })
        .collect()
}

/// Overwrite every `every`-th value (starting at `offset`) with NaN.
pub fn inject_missing(values: &mut [f64], offset: usize, every: usize) {
    if every == 0 {
        return;
    }
    for v in values.iter_mut().skip(offset).step_by(every) {
        *v = f64::NAN;
    }
}

fn simple_hash(i: u32, seed: u32) -> u32 {
    let mut h = seed.wrapping_mul(0x9e37_79b9);
    h = h.wrapping_mul(31).wrapping_add(i);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
