//! Injectable clock and entropy
//!
//! Key generation draws seeds from an [`Entropy`] source; manifest lookups
//! wait between rate-limited attempts on a [`Clock`]. Production wires the OS
//! and wall clock, tests wire a seeded generator and a manual clock that moves
//! forward when asked to wait.

use crate::{Result, UnlError};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Unix time in milliseconds
    fn now_millis(&self) -> Result<u64>;

    /// Move a manual clock forward; wall clocks ignore this
    fn advance(&self, _by: Duration) -> Result<()> {
        Ok(())
    }

    /// Whether waits should advance this clock instead of sleeping
    fn is_manual(&self) -> bool {
        false
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_millis(&self) -> Result<u64> {
        #[allow(clippy::disallowed_methods)]
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| UnlError::invalid(format!("system clock is before 1970: {e}")))?;
        u64::try_from(elapsed.as_millis())
            .map_err(|_| UnlError::invalid("system clock out of range"))
    }
}

/// Clock that only moves when advanced
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<Mutex<u64>>,
}

impl ManualClock {
    /// Start at `unix_seconds`
    pub fn starting_at(unix_seconds: u64) -> Self {
        Self {
            millis: Arc::new(Mutex::new(unix_seconds.saturating_mul(1000))),
        }
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Result<u64> {
        self.millis
            .lock()
            .map(|millis| *millis)
            .map_err(|_| UnlError::invalid("manual clock lock poisoned"))
    }

    fn advance(&self, by: Duration) -> Result<()> {
        let mut millis = self
            .millis
            .lock()
            .map_err(|_| UnlError::invalid("manual clock lock poisoned"))?;
        let step = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        *millis = millis.saturating_add(step);
        Ok(())
    }

    fn is_manual(&self) -> bool {
        true
    }
}

/// Source of key material
pub trait Entropy: Send + Sync {
    /// Fill `dest` with random bytes
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system entropy
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        #[allow(clippy::disallowed_types)]
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| UnlError::crypto(format!("OS entropy unavailable: {e}")))
    }
}

/// Reproducible entropy from a fixed seed
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: Arc<Mutex<StdRng>>,
}

impl SeededEntropy {
    /// Seed from a number
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Seed from a label, so each test draws its own stream
    pub fn from_label(label: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        label.hash(&mut hasher);
        Self::new(hasher.finish())
    }
}

impl Entropy for SeededEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| UnlError::crypto("seeded entropy lock poisoned"))?;
        rng.fill_bytes(dest);
        Ok(())
    }
}

/// Start time for deterministic effects: 2025-01-01T00:00:00Z
pub const TEST_EPOCH: u64 = 1_735_689_600;

/// Clock and entropy handed to key generation and list assembly
///
/// Clones share the same clock and generator.
#[derive(Clone)]
pub struct Effects {
    /// Current time and waits
    pub clock: Arc<dyn Clock>,
    /// Key material
    pub entropy: Arc<dyn Entropy>,
}

impl Effects {
    /// Wall clock and OS entropy
    pub fn production() -> Self {
        Self {
            clock: Arc::new(WallClock),
            entropy: Arc::new(OsEntropy),
        }
    }

    /// Manual clock at `unix_seconds` and entropy seeded with `seed`
    pub fn deterministic(seed: u64, unix_seconds: u64) -> Self {
        Self {
            clock: Arc::new(ManualClock::starting_at(unix_seconds)),
            entropy: Arc::new(SeededEntropy::new(seed)),
        }
    }

    /// Deterministic effects with seed 0 at [`TEST_EPOCH`]
    pub fn test() -> Self {
        Self::deterministic(0, TEST_EPOCH)
    }

    /// Deterministic effects at [`TEST_EPOCH`] seeded from a test name
    pub fn for_test(name: &str) -> Self {
        Self {
            clock: Arc::new(ManualClock::starting_at(TEST_EPOCH)),
            entropy: Arc::new(SeededEntropy::from_label(name)),
        }
    }

    /// Unix time in seconds
    pub fn now(&self) -> Result<u64> {
        Ok(self.clock.now_millis()? / 1000)
    }

    /// Unix time in milliseconds
    pub fn now_millis(&self) -> Result<u64> {
        self.clock.now_millis()
    }

    /// `N` bytes of key material
    pub fn random_bytes<const N: usize>(&self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.entropy.fill(&mut bytes)?;
        Ok(bytes)
    }

    /// Whether waits advance a manual clock
    pub fn is_simulated(&self) -> bool {
        self.clock.is_manual()
    }

    /// Wait for `duration`; a manual clock is advanced instead
    pub async fn delay(&self, duration: Duration) {
        if self.clock.is_manual() {
            if let Err(e) = self.clock.advance(duration) {
                tracing::debug!(error = %e, "Failed to advance manual clock");
            }
        } else {
            tokio::time::sleep(duration).await;
        }
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::production()
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects")
            .field("simulated", &self.is_simulated())
            .finish_non_exhaustive()
    }
}
