//! Market History
//!
//! Recent prices and dividends plus the moving averages the technical bits
//! are read from.

use agora_core::{Indicators, MA_WINDOWS, MarketMode, MarketState};
use serde::Serialize;
use std::collections::VecDeque;

/// Price changes the technical word looks back over
const PRICE_LAGS: usize = 3;
/// Dividend changes the fundamental word looks back over
const DIVIDEND_LAGS: usize = 2;

/// Simple moving average over a fixed window
#[derive(Debug, Clone, Serialize)]
pub struct RollingMean {
    values: VecDeque<f64>,
    window_size: usize,
    /// Running sum for O(1) mean updates
    sum: f64,
}

impl RollingMean {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(removed) = self.values.pop_front() {
                self.sum -= removed;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    #[inline]
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.values.len() >= self.window_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketHistory {
    mode: MarketMode,
    interest_rate: f64,
    mean_dividend: f64,
    averages: [RollingMean; 4],
    prices: VecDeque<f64>,
    dividends: VecDeque<f64>,
}

impl MarketHistory {
    pub fn new(mode: MarketMode, interest_rate: f64, mean_dividend: f64) -> Self {
        Self {
            mode,
            interest_rate,
            mean_dividend,
            averages: MA_WINDOWS.map(RollingMean::new),
            prices: VecDeque::with_capacity(PRICE_LAGS + 1),
            dividends: VecDeque::with_capacity(DIVIDEND_LAGS + 1),
        }
    }

    /// Long-run dividend the dividend ratio is measured against
    pub fn set_mean_dividend(&mut self, mean: f64) {
        self.mean_dividend = mean;
    }

    pub fn push_price(&mut self, price: f64) {
        push_bounded(&mut self.prices, price, PRICE_LAGS + 1);
        for average in &mut self.averages {
            average.push(price);
        }
    }

    pub fn push_dividend(&mut self, dividend: f64) {
        push_bounded(&mut self.dividends, dividend, DIVIDEND_LAGS + 1);
    }

    pub fn price(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn dividend(&self) -> Option<f64> {
        self.dividends.back().copied()
    }

    /// Moving average for the window at `MA_WINDOWS[index]`
    pub fn moving_average(&self, index: usize) -> Option<f64> {
        self.averages.get(index).and_then(RollingMean::mean)
    }

    /// Raw indicators for the latest price and dividend
    pub fn indicators(&self) -> Indicators {
        let price = self.price().unwrap_or(0.0);
        let dividend = self.dividend().unwrap_or(0.0);

        let dividend_ratio = if self.mean_dividend > 0.0 {
            dividend / self.mean_dividend
        } else {
            0.0
        };
        let value_ratio = match self.mode {
            MarketMode::Classic if dividend > 0.0 => price * self.interest_rate / dividend,
            MarketMode::Classic => 0.0,
            MarketMode::Lmsr if price < 1.0 => price / (1.0 - price),
            MarketMode::Lmsr => f64::INFINITY,
        };

        let averages: Vec<Option<f64>> = (0..MA_WINDOWS.len())
            .map(|i| self.moving_average(i))
            .collect();
        let mut price_above_ma = [false; 4];
        for (flag, average) in price_above_ma.iter_mut().zip(&averages) {
            *flag = average.is_some_and(|m| price > m);
        }
        let mut ma_rising = [false; 3];
        for (i, flag) in ma_rising.iter_mut().enumerate() {
            *flag = matches!((averages[i], averages[i + 1]), (Some(fast), Some(slow)) if fast > slow);
        }
        let trend_ratio = match averages[1] {
            Some(ma) if ma > 0.0 => price / ma,
            _ => 0.0,
        };

        Indicators {
            dividend_ratio,
            value_ratio,
            dividend_up: rises(&self.dividends),
            price_up: rises(&self.prices),
            price_above_ma,
            ma_rising,
            trend_ratio,
        }
    }

    pub fn state(&self) -> MarketState {
        MarketState::encode(&self.indicators())
    }
}

fn push_bounded(values: &mut VecDeque<f64>, value: f64, cap: usize) {
    if values.len() >= cap {
        values.pop_front();
    }
    values.push_back(value);
}

/// `flags[k]`: the value rose `k` steps back from the newest
fn rises<const N: usize>(values: &VecDeque<f64>) -> [bool; N] {
    let mut flags = [false; N];
    let n = values.len();
    for (k, flag) in flags.iter_mut().enumerate() {
        if n >= k + 2 {
            *flag = values[n - 1 - k] > values[n - 2 - k];
        }
    }
    flags
}
