//! Prompt construction for the LLM advisor.

use pilot_core::{Timeframe, TradingMode};
use pilot_exchange::{Candle, MarketSnapshot};
use std::fmt::Write;

/// System instruction fixing the reply format.
pub const SYSTEM_PROMPT: &str = "You are a disciplined perpetual-futures analyst. \
Reply with a single JSON object and nothing else, using exactly these keys: \
direction (\"long\", \"short\" or \"none\"), entry_price (number), \
stop_loss (number), take_profit (number), confidence (integer 1-100), \
strategy (\"market\" or \"limit\"), rationale (short string). \
Recommend \"none\" whenever the picture is unclear.";

/// Render the market snapshot into the user prompt.
pub fn build_prompt(snapshot: &MarketSnapshot, mode: TradingMode) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Symbol: {} | mode: {mode} | current price: {}",
        snapshot.symbol, snapshot.price
    );

    let mut timeframes: Vec<&Timeframe> = snapshot.candles.keys().collect();
    timeframes.sort_by_key(|tf| tf.minutes());
    for timeframe in timeframes {
        if let Some(candles) = snapshot.candles.get(timeframe) {
            let _ = writeln!(out, "\n{timeframe} candles (oldest first):");
            // The tail is what matters; cap the prompt size.
            for candle in candles.iter().rev().take(30).rev() {
                let _ = writeln!(out, "{}", format_candle(candle));
            }
        }
    }

    if let Some(imbalance) = snapshot.orderbook.bid_imbalance() {
        let _ = writeln!(out, "\nOrderbook bid imbalance: {:.3}", imbalance);
    }
    if let (Some(bid), Some(ask)) = (snapshot.orderbook.best_bid(), snapshot.orderbook.best_ask())
    {
        let _ = writeln!(out, "Best bid {bid} / best ask {ask}");
    }

    let _ = write!(
        out,
        "\nGive one {} recommendation for {} as the JSON object described.",
        mode.primary_timeframe(),
        snapshot.symbol
    );
    out
}

fn format_candle(candle: &Candle) -> String {
    format!(
        "{} o:{} h:{} l:{} c:{} v:{}",
        candle.time.format("%Y-%m-%d %H:%M"),
        candle.open,
        candle.high,
        candle.low,
        candle.close,
        candle.volume
    )
}
