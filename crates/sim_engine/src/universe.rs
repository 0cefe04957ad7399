//! Synthetic operation universe.
//!
//! Builds the venue legs a run operates over: venue, trading pair, and
//! display prices. The jitter here is UI flavor only — allotted profit
//! always comes from the allocator, never from these prices.

use rand::Rng;

/// Venue book for synthetic legs.
const VENUES: &[&str] = &[
    "Binance", "Kraken", "Coinbase", "OKX", "Bybit", "KuCoin", "Bitfinex", "Gate.io",
];

/// Trading pairs with a synthetic base price in cents.
const PAIRS: &[(&str, i64)] = &[
    ("BTC/USDT", 6_450_000),
    ("ETH/USDT", 318_000),
    ("SOL/USDT", 14_500),
    ("BNB/USDT", 59_000),
    ("XRP/USDT", 52),
    ("ADA/USDT", 45),
    ("DOGE/USDT", 12),
    ("LTC/USDT", 8_400),
];

/// One synthetic venue leg: where the simulated operation "trades".
#[derive(Debug, Clone)]
pub struct VenueLeg {
    pub venue: String,
    pub pair: String,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    pub spread_cents: i64,
}

pub struct UniverseBuilder;

impl UniverseBuilder {
    /// Build `count` legs with a thread-local RNG.
    pub fn build(count: usize) -> Vec<VenueLeg> {
        Self::build_with(&mut rand::thread_rng(), count)
    }

    /// Build `count` legs with a caller-supplied RNG (deterministic in
    /// tests). Pairs rotate from a random offset so a run's legs show
    /// distinct markets; venues are drawn independently.
    pub fn build_with<R: Rng>(rng: &mut R, count: usize) -> Vec<VenueLeg> {
        let offset = rng.gen_range(0..PAIRS.len());
        (0..count)
            .map(|i| {
                let venue = VENUES[rng.gen_range(0..VENUES.len())];
                let (pair, base) = PAIRS[(offset + i) % PAIRS.len()];

                // ±2% jitter on the entry price, in basis points.
                let jitter_bps = rng.gen_range(-200..=200);
                let buy = (base + base * jitter_bps / 10_000).max(1);

                // Spread of 5–60 bps, floored at one cent.
                let spread = (buy * rng.gen_range(5..=60) / 10_000).max(1);

                VenueLeg {
                    venue: venue.to_string(),
                    pair: pair.to_string(),
                    buy_price_cents: buy,
                    sell_price_cents: buy + spread,
                    spread_cents: spread,
                }
            })
            .collect()
    }
}
