//! Synthetic market data for demo runs and tests.
//!
//! Each product gets its own deterministic generator seeded from the BLAKE3
//! hash of its name, so adding a product never changes another product's
//! path. A slowly mean-reverting latent drift drives both the price and a
//! noisy signal, which gives the threshold machine something to trade.

use chrono::{Datelike, Duration, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use ctalab_core::{CoreError, DateRange, OhlcvFrame, Panel, Product, Series, Timestamp};

/// Session start and bar spacing of the synthetic intraday grid.
const SESSION_OPEN_HOUR: u32 = 9;
const BAR_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticMarket {
    pub signals: Panel<f64>,
    pub prices: Panel<f64>,
    pub liquidity: Panel<f64>,
    pub ohlcv: BTreeMap<Product, OhlcvFrame>,
}

/// Weekday bar timestamps inside `range`, `bars_per_day` per session.
pub fn bar_index(range: &DateRange, bars_per_day: usize) -> Vec<Timestamp> {
    let open = NaiveTime::from_hms_opt(SESSION_OPEN_HOUR, 0, 0).unwrap_or_default();
    let mut index = Vec::new();
    let mut day = range.start;
    while day <= range.end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let session = day.and_time(open);
            for bar in 0..bars_per_day {
                index.push(session + Duration::minutes(BAR_MINUTES * bar as i64));
            }
        }
        day += Duration::days(1);
    }
    index
}

struct ProductPath {
    signal: Vec<f64>,
    close: Vec<f64>,
    frame: OhlcvFrame,
    liquidity: Vec<f64>,
}

fn product_path(product: &str, index: &[Timestamp]) -> Result<ProductPath, CoreError> {
    let seed: [u8; 32] = *blake3::hash(product.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let n = index.len();
    let mut signal = Vec::with_capacity(n);
    let mut open = Vec::with_capacity(n);
    let mut high = Vec::with_capacity(n);
    let mut low = Vec::with_capacity(n);
    let mut close = Vec::with_capacity(n);
    let mut volume = Vec::with_capacity(n);
    let mut liquidity = Vec::with_capacity(n);

    let mut price = rng.gen_range(2_000.0..60_000.0_f64);
    let mut drift = 0.0_f64;
    for _ in 0..n {
        drift = 0.97 * drift + rng.gen_range(-0.3..0.3);
        // signal leads the next bar's move
        signal.push(drift + rng.gen_range(-0.5..0.5));

        let bar_return = drift * 0.002 + rng.gen_range(-0.004..0.004);
        let o = price;
        let c = price * (1.0 + bar_return);
        open.push(o);
        high.push(o.max(c) * (1.0 + rng.gen_range(0.0..0.002)));
        low.push(o.min(c) * (1.0 - rng.gen_range(0.0..0.002)));
        close.push(c);
        volume.push(rng.gen_range(1_000.0..50_000.0));
        liquidity.push(rng.gen_range(5e8..5e9));
        price = c;
    }

    let frame = OhlcvFrame::new(index.to_vec(), open, high, low, close.clone(), volume)?;
    Ok(ProductPath {
        signal,
        close,
        frame,
        liquidity,
    })
}

impl SyntheticMarket {
    pub fn generate(
        products: &[Product],
        range: &DateRange,
        bars_per_day: usize,
    ) -> Result<Self, CoreError> {
        if bars_per_day == 0 {
            return Err(CoreError::InvalidParameter("bars_per_day must be >= 1".into()));
        }
        let index = bar_index(range, bars_per_day);

        let mut signals = Vec::new();
        let mut prices = Vec::new();
        let mut liquidity = Vec::new();
        let mut ohlcv = BTreeMap::new();
        for product in products {
            let path = product_path(product, &index)?;
            let column = |values: Vec<f64>| Series::from_pairs(index.iter().copied().zip(values));
            signals.push((product.clone(), column(path.signal)));
            prices.push((product.clone(), column(path.close)));
            liquidity.push((product.clone(), column(path.liquidity)));
            ohlcv.insert(product.clone(), path.frame);
        }

        Ok(Self {
            signals: Panel::from_series(signals),
            prices: Panel::from_series(prices),
            liquidity: Panel::from_series(liquidity),
            ohlcv,
        })
    }
}
