pub mod range;

/// Root-mean-square of a set of samples, zero for an empty set.
pub fn rms(samples: impl Iterator<Item = f32>) -> f32 {
    let mut sum_sq = 0.0f32;
    let mut count = 0usize;
    for s in samples {
        sum_sq += s * s;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    libm::sqrtf(sum_sq / count as f32)
}
