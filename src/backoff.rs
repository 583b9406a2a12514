use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(base.min(self.max.as_secs_f64()))
    }

    pub fn jittered(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        self.delay(attempt).mul_f64(rng.gen_range(0.5..1.5))
    }

    pub fn iter(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            attempt: 0,
        }
    }
}

pub struct Backoff<'a> {
    config: &'a BackoffConfig,
    attempt: u32,
}

impl Backoff<'_> {
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub async fn sleep(&mut self) {
        tokio::time::sleep(self.next_delay()).await;
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
