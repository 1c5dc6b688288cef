use std::time::Duration;

/// Timing and retry parameters shared by all operations on one card.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wait between a configuration write and its readback.
    pub config_settle: Duration,
    /// Wait between a PLL reset and the lock check.
    pub pll_settle: Duration,
    /// How often a GTH phase shift is repeated before giving up on a
    /// shift counter that does not match the expected value.
    pub max_gth_shift_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_settle: Duration::from_micros(250),
            pll_settle: Duration::from_micros(100),
            max_gth_shift_retries: 100,
        }
    }
}

/// Builder to create a [Config] with modified options
///
/// # Example
///
/// ```
/// use gem_amc::config::Builder;
/// use std::time::Duration;
///
/// let config = Builder::new()
///     .pll_settle(Duration::from_micros(200))
///     .max_gth_shift_retries(20)
///     .build();
/// assert_eq!(config.max_gth_shift_retries, 20);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the wait between a configuration write and its readback
    pub fn config_settle(mut self, settle: Duration) -> Self {
        self.config.config_settle = settle;
        self
    }

    /// Set the time the PLL gets to lock after a reset
    pub fn pll_settle(mut self, settle: Duration) -> Self {
        self.config.pll_settle = settle;
        self
    }

    /// Set the bound on repeated GTH shifts
    pub fn max_gth_shift_retries(mut self, retries: u32) -> Self {
        self.config.max_gth_shift_retries = retries;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Blocks for the given hardware settle time. A zero duration returns immediately.
pub(crate) fn settle(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
