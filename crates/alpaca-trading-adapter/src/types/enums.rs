/*
[INPUT]:  Trading API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which Alpaca environment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Paper,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

/// Order class. The API reports simple orders as either `simple` or `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderClass {
    #[default]
    #[serde(alias = "")]
    Simple,
    Bracket,
    Oco,
    Oto,
    Mleg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Opg,
    Cls,
    Ioc,
    Fok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    PendingReview,
    Accepted,
    PendingNew,
    AcceptedForBidding,
    Stopped,
    Rejected,
    Suspended,
    Calculated,
    Held,
}

/// Status filter for order queries; not the same as [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOrderStatus {
    Open,
    Closed,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionIntent {
    BuyToOpen,
    BuyToClose,
    SellToOpen,
    SellToClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// Event kind carried by a trade update.
///
/// Unknown kinds are preserved verbatim in [`TradeEvent::Other`] so new server
/// events never break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TradeEvent {
    New,
    Fill,
    PartialFill,
    Canceled,
    Expired,
    DoneForDay,
    Replaced,
    Rejected,
    PendingNew,
    Stopped,
    PendingCancel,
    PendingReplace,
    Calculated,
    Suspended,
    OrderReplaceRejected,
    OrderCancelRejected,
    Restated,
    Held,
    Other(String),
}

impl TradeEvent {
    pub fn as_str(&self) -> &str {
        match self {
            TradeEvent::New => "new",
            TradeEvent::Fill => "fill",
            TradeEvent::PartialFill => "partial_fill",
            TradeEvent::Canceled => "canceled",
            TradeEvent::Expired => "expired",
            TradeEvent::DoneForDay => "done_for_day",
            TradeEvent::Replaced => "replaced",
            TradeEvent::Rejected => "rejected",
            TradeEvent::PendingNew => "pending_new",
            TradeEvent::Stopped => "stopped",
            TradeEvent::PendingCancel => "pending_cancel",
            TradeEvent::PendingReplace => "pending_replace",
            TradeEvent::Calculated => "calculated",
            TradeEvent::Suspended => "suspended",
            TradeEvent::OrderReplaceRejected => "order_replace_rejected",
            TradeEvent::OrderCancelRejected => "order_cancel_rejected",
            TradeEvent::Restated => "restated",
            TradeEvent::Held => "held",
            TradeEvent::Other(raw) => raw,
        }
    }

    /// True for the two events that carry execution price and quantity.
    pub fn is_execution(&self) -> bool {
        matches!(self, TradeEvent::Fill | TradeEvent::PartialFill)
    }
}

impl From<String> for TradeEvent {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "new" => TradeEvent::New,
            "fill" => TradeEvent::Fill,
            "partial_fill" => TradeEvent::PartialFill,
            "canceled" => TradeEvent::Canceled,
            "expired" => TradeEvent::Expired,
            "done_for_day" => TradeEvent::DoneForDay,
            "replaced" => TradeEvent::Replaced,
            "rejected" => TradeEvent::Rejected,
            "pending_new" => TradeEvent::PendingNew,
            "stopped" => TradeEvent::Stopped,
            "pending_cancel" => TradeEvent::PendingCancel,
            "pending_replace" => TradeEvent::PendingReplace,
            "calculated" => TradeEvent::Calculated,
            "suspended" => TradeEvent::Suspended,
            "order_replace_rejected" => TradeEvent::OrderReplaceRejected,
            "order_cancel_rejected" => TradeEvent::OrderCancelRejected,
            "restated" => TradeEvent::Restated,
            "held" => TradeEvent::Held,
            _ => TradeEvent::Other(raw),
        }
    }
}

impl From<TradeEvent> for String {
    fn from(event: TradeEvent) -> Self {
        match event {
            TradeEvent::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire value of an enum without the surrounding JSON quotes.
pub(crate) fn wire_value<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(raw)) => raw,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_event_keeps_unknown_kinds() {
        let event: TradeEvent = serde_json::from_str("\"margin_call\"").unwrap();
        assert_eq!(event, TradeEvent::Other("margin_call".to_string()));
        assert_eq!(serde_json::to_string(&event).unwrap(), "\"margin_call\"");
    }

    #[test]
    fn trade_event_known_kinds_round_trip_wire_names() {
        let event: TradeEvent = serde_json::from_str("\"partial_fill\"").unwrap();
        assert_eq!(event, TradeEvent::PartialFill);
        assert!(event.is_execution());
        assert_eq!(event.to_string(), "partial_fill");
    }

    #[test]
    fn empty_order_class_is_simple() {
        let class: OrderClass = serde_json::from_str("\"\"").unwrap();
        assert_eq!(class, OrderClass::Simple);
    }

    #[test]
    fn wire_value_strips_quotes() {
        assert_eq!(wire_value(&QueryOrderStatus::Closed), "closed");
        assert_eq!(wire_value(&Sort::Asc), "asc");
    }
}
