use std::time::Duration;

use rand::Rng;

/// Sleeps `base_ms` plus a random extra of up to `jitter_ms`.
pub async fn sleep_with_jitter(base_ms: u64, jitter_ms: u64) {
    tokio::time::sleep(Duration::from_millis(base_ms + jitter(jitter_ms))).await;
}

fn jitter(max_ms: u64) -> u64 {
    rand::rng().random_range(0..=max_ms)
}
