/*
[INPUT]:  Trading API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    AssetClass, OrderClass, OrderSide, OrderStatus, OrderType, PositionIntent, PositionSide,
    TimeInForce, TradeEvent,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub client_order_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_by: Option<Uuid>,
    #[serde(default)]
    pub replaces: Option<Uuid>,
    pub asset_id: Uuid,
    pub symbol: String,
    pub asset_class: AssetClass,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub notional: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub qty: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub filled_qty: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub filled_avg_price: Option<Decimal>,
    #[serde(default)]
    pub order_class: OrderClass,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub limit_price: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    #[serde(default)]
    pub extended_hours: bool,
    #[serde(default)]
    pub legs: Option<Vec<Order>>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub trail_percent: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub trail_price: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub hwm: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_intent: Option<PositionIntent>,
}

/// One event from the `trade_updates` stream.
///
/// `price`, `qty` and `execution_id` are only present on fill events;
/// `position_qty` is the position size after the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub event: TradeEvent,
    #[serde(default)]
    pub execution_id: Option<Uuid>,
    pub order: Order,
    #[serde(alias = "at")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub position_qty: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub qty: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub asset_id: Uuid,
    pub symbol: String,
    pub exchange: String,
    pub asset_class: AssetClass,
    #[serde(with = "serde_helpers::decimal")]
    pub avg_entry_price: Decimal,
    #[serde(with = "serde_helpers::decimal")]
    pub qty: Decimal,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub qty_available: Option<Decimal>,
    pub side: PositionSide,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub market_value: Option<Decimal>,
    #[serde(with = "serde_helpers::decimal")]
    pub cost_basis: Decimal,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub unrealized_pl: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub unrealized_plpc: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub unrealized_intraday_pl: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub unrealized_intraday_plpc: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub current_price: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub lastday_price: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub change_today: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAccount {
    pub id: Uuid,
    pub account_number: String,
    pub status: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub cash: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub buying_power: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub equity: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub last_equity: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub portfolio_value: Option<Decimal>,
    #[serde(default, with = "serde_helpers::optional_decimal")]
    pub multiplier: Option<Decimal>,
    #[serde(default)]
    pub pattern_day_trader: Option<bool>,
    #[serde(default)]
    pub trading_blocked: Option<bool>,
    #[serde(default)]
    pub transfers_blocked: Option<bool>,
    #[serde(default)]
    pub account_blocked: Option<bool>,
    #[serde(default)]
    pub shorting_enabled: Option<bool>,
    #[serde(default)]
    pub daytrade_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

pub(crate) mod serde_helpers {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    /// Prices and quantities arrive as strings on most endpoints and as
    /// numbers on a few; both decode to `Decimal`.
    fn decimal_from_value<E: serde::de::Error>(value: Value) -> Result<Option<Decimal>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(raw) if raw.trim().is_empty() => Ok(None),
            Value::String(raw) => Decimal::from_str(raw.trim()).map(Some).map_err(E::custom),
            Value::Number(number) => Decimal::from_str(&number.to_string())
                .or_else(|_| Decimal::from_scientific(&number.to_string()))
                .map(Some)
                .map_err(E::custom),
            _ => Err(E::custom("invalid decimal value")),
        }
    }

    pub mod decimal {
        use super::*;
        use serde::Serializer;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            decimal_from_value(value)?
                .ok_or_else(|| serde::de::Error::custom("missing decimal value"))
        }

        pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&value.to_string())
        }
    }

    pub mod optional_decimal {
        use super::*;
        use serde::Serializer;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            decimal_from_value(value)
        }

        pub fn serialize<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_str(&value.to_string()),
                None => serializer.serialize_none(),
            }
        }
    }
}
