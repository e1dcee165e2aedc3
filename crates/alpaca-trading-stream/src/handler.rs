/*
[INPUT]:  Trade updates delivered by the trading stream
[OUTPUT]: One structured log line per update
[POS]:    Handler layer - trade update logging
[UPDATE]: When changing which trade update fields are reported
*/

use alpaca_trading_adapter::TradeUpdateEvent;
use rust_decimal::Decimal;
use tracing::info;

/// Fields reported for one trade update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub event: String,
    pub symbol: String,
    pub qty: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// Extract the reported fields, from typed or raw updates
pub fn summarize(event: &TradeUpdateEvent) -> UpdateSummary {
    match event {
        TradeUpdateEvent::Typed(update) => UpdateSummary {
            event: update.event.to_string(),
            symbol: update.order.symbol.clone(),
            qty: update.qty.or(update.order.qty),
            price: update.price.or(update.order.limit_price),
        },
        TradeUpdateEvent::Raw(data) => {
            let text = |value: &serde_json::Value| value.as_str().map(str::to_string);
            let decimal = |value: &serde_json::Value| {
                value.as_str().and_then(|raw| raw.parse::<Decimal>().ok())
            };
            UpdateSummary {
                event: text(&data["event"]).unwrap_or_else(|| "unknown".to_string()),
                symbol: text(&data["order"]["symbol"]).unwrap_or_default(),
                qty: decimal(&data["qty"]).or_else(|| decimal(&data["order"]["qty"])),
                price: decimal(&data["price"]).or_else(|| decimal(&data["order"]["limit_price"])),
            }
        }
    }
}

/// Trade update handler used by the runner
pub async fn log_trade_update(event: TradeUpdateEvent) {
    let summary = summarize(&event);
    info!(
        event = %summary.event,
        symbol = %summary.symbol,
        qty = ?summary.qty,
        price = ?summary.price,
        "trade update"
    );
}
