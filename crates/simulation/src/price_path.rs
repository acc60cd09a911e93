//! Price path generators for scenario runs.
//!
//! Prices are token1 per token0 as [`Decimal`]s. Every path starts with the
//! initial price, so a path for `steps` steps has `steps + 1` points.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

pub trait PricePathGenerator {
    fn generate(&mut self, steps: usize) -> Vec<Decimal>;
}

/// Geometric Brownian motion with annualized drift and volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricBrownianMotion {
    pub initial_price: Decimal,
    /// Annualized drift (mu).
    pub drift: f64,
    /// Annualized volatility (sigma).
    pub volatility: f64,
    /// Step length in years, e.g. 1/8760 for hourly.
    pub time_step: f64,
    /// Fixed seed for reproducible paths.
    pub seed: Option<u64>,
}

impl GeometricBrownianMotion {
    #[must_use]
    pub fn new(initial_price: Decimal, drift: f64, volatility: f64, time_step: f64) -> Self {
        Self {
            initial_price,
            drift,
            volatility,
            time_step,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl PricePathGenerator for GeometricBrownianMotion {
    fn generate(&mut self, steps: usize) -> Vec<Decimal> {
        let mut prices = Vec::with_capacity(steps + 1);
        prices.push(self.initial_price);

        let mut rng = self.rng();
        let dt = self.time_step;
        let drift_term = (self.drift - 0.5 * self.volatility.powi(2)) * dt;
        let vol_term = self.volatility * dt.sqrt();

        let mut current = self.initial_price.to_f64().unwrap_or(0.0);
        let mut last = self.initial_price;
        for _ in 0..steps {
            let z: f64 = rng.sample(StandardNormal);
            current *= (drift_term + vol_term * z).exp();
            // An unrepresentable step repeats the previous price.
            let price = Decimal::from_f64(current)
                .filter(|p| p.is_sign_positive() && !p.is_zero())
                .unwrap_or(last);
            prices.push(price);
            last = price;
        }

        prices
    }
}

/// Replays a fixed list of prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicPricePath {
    pub prices: Vec<Decimal>,
}

impl DeterministicPricePath {
    #[must_use]
    pub fn new(prices: Vec<Decimal>) -> Self {
        Self { prices }
    }

    /// `steps + 1` prices moving linearly from `from` to `to`.
    #[must_use]
    pub fn linear(from: Decimal, to: Decimal, steps: usize) -> Self {
        if steps == 0 {
            return Self::new(vec![from]);
        }
        let increment = (to - from) / Decimal::from(steps);
        let prices = (0..=steps)
            .map(|i| from + increment * Decimal::from(i))
            .collect();
        Self::new(prices)
    }
}

impl PricePathGenerator for DeterministicPricePath {
    fn generate(&mut self, steps: usize) -> Vec<Decimal> {
        self.prices.iter().copied().take(steps + 1).collect()
    }
}
