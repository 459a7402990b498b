use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

/// Length of a generated identifier in hex characters.
pub const ID_LEN: usize = 24;

const COUNTER_MASK: u32 = 0x00ff_ffff;
const RANDOM_MASK: u64 = 0x00ff_ffff_ffff;

/// Generates 24-hex-character document ids.
///
/// Layout: unix seconds (hex), 10 random hex digits, then a 6-digit counter
/// that starts at a random value and wraps. Ids are unique within one
/// generator; across processes only the random part separates them.
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU32,
}

impl IdGenerator {
    pub fn new() -> Self {
        let seed = rand::thread_rng().gen::<u32>() & COUNTER_MASK;
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u32) -> Self {
        IdGenerator {
            counter: AtomicU32::new(seed & COUNTER_MASK),
        }
    }

    pub fn next_id(&self) -> String {
        let seconds = chrono::Utc::now().timestamp().max(0) as u64;
        let random = rand::thread_rng().gen::<u64>() & RANDOM_MASK;
        let counter = self.next_counter();

        let mut id = format!("{seconds:x}{random:010x}{counter:06x}");
        id.truncate(ID_LEN);
        while id.len() < ID_LEN {
            id.push('0');
        }
        id
    }

    fn next_counter(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
