/*
[INPUT]:  Trading API schema definitions and serde requirements
[OUTPUT]: Typed Rust request structs with serialization support and validation
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{
    OrderClass, OrderSide, OrderType, PositionIntent, QueryOrderStatus, Sort, TimeInForce,
    wire_value,
};
use crate::http::{AlpacaError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitRequest {
    #[serde(with = "rust_decimal::serde::str")]
    pub limit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossRequest {
    #[serde(with = "rust_decimal::serde::str")]
    pub stop_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
}

/// Body of `POST /v2/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<Decimal>,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_hours: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<OrderClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<TakeProfitRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopLossRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_intent: Option<PositionIntent>,
}

impl OrderRequest {
    fn base(symbol: &str, side: OrderSide, order_type: OrderType, tif: TimeInForce) -> Self {
        Self {
            symbol: symbol.to_string(),
            qty: None,
            notional: None,
            side,
            order_type,
            time_in_force: tif,
            limit_price: None,
            stop_price: None,
            trail_price: None,
            trail_percent: None,
            extended_hours: None,
            client_order_id: None,
            order_class: None,
            take_profit: None,
            stop_loss: None,
            position_intent: None,
        }
    }

    /// Market order for a share quantity
    pub fn market(symbol: &str, side: OrderSide, qty: Decimal, tif: TimeInForce) -> Self {
        Self {
            qty: Some(qty),
            ..Self::base(symbol, side, OrderType::Market, tif)
        }
    }

    /// Market order for a dollar amount (fractional shares)
    pub fn market_notional(
        symbol: &str,
        side: OrderSide,
        notional: Decimal,
        tif: TimeInForce,
    ) -> Self {
        Self {
            notional: Some(notional),
            ..Self::base(symbol, side, OrderType::Market, tif)
        }
    }

    pub fn limit(
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
        limit_price: Decimal,
        tif: TimeInForce,
    ) -> Self {
        Self {
            qty: Some(qty),
            limit_price: Some(limit_price),
            ..Self::base(symbol, side, OrderType::Limit, tif)
        }
    }

    pub fn stop(
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
        stop_price: Decimal,
        tif: TimeInForce,
    ) -> Self {
        Self {
            qty: Some(qty),
            stop_price: Some(stop_price),
            ..Self::base(symbol, side, OrderType::Stop, tif)
        }
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    pub fn with_extended_hours(mut self, extended_hours: bool) -> Self {
        self.extended_hours = Some(extended_hours);
        self
    }

    /// Turn this order into a bracket with the given exits
    pub fn with_bracket(mut self, take_profit: TakeProfitRequest, stop_loss: StopLossRequest) -> Self {
        self.order_class = Some(OrderClass::Bracket);
        self.take_profit = Some(take_profit);
        self.stop_loss = Some(stop_loss);
        self
    }

    /// Check the field combinations the API rejects
    pub fn validate(&self) -> Result<()> {
        match (self.qty, self.notional) {
            (None, None) => {
                return Err(AlpacaError::InvalidRequest(
                    "at least one of qty or notional must be provided".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(AlpacaError::InvalidRequest(
                    "both qty and notional can not be set".to_string(),
                ));
            }
            _ => {}
        }

        match self.order_type {
            OrderType::Limit if self.limit_price.is_none() => Err(AlpacaError::InvalidRequest(
                "limit orders require limit_price".to_string(),
            )),
            OrderType::Stop if self.stop_price.is_none() => Err(AlpacaError::InvalidRequest(
                "stop orders require stop_price".to_string(),
            )),
            OrderType::StopLimit if self.stop_price.is_none() || self.limit_price.is_none() => {
                Err(AlpacaError::InvalidRequest(
                    "stop_limit orders require stop_price and limit_price".to_string(),
                ))
            }
            OrderType::TrailingStop
                if self.trail_price.is_some() == self.trail_percent.is_some() =>
            {
                Err(AlpacaError::InvalidRequest(
                    "trailing_stop orders require exactly one of trail_price or trail_percent"
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Filters for `GET /v2/orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetOrdersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QueryOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

impl GetOrdersRequest {
    /// Query-string pairs in the shape the API expects (symbols comma-joined).
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status {
            params.push(("status", wire_value(&status)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after", after.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
        }
        if let Some(until) = self.until {
            params.push(("until", until.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
        }
        if let Some(direction) = self.direction {
            params.push(("direction", wire_value(&direction)));
        }
        if let Some(nested) = self.nested {
            params.push(("nested", nested.to_string()));
        }
        if let Some(side) = self.side {
            params.push(("side", wire_value(&side)));
        }
        if let Some(symbols) = self.symbols.as_ref().filter(|symbols| !symbols.is_empty()) {
            params.push(("symbols", symbols.join(",")));
        }
        params
    }
}

/// Partial or full liquidation of one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePositionRequest {
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
}

impl ClosePositionRequest {
    pub fn qty(qty: Decimal) -> Self {
        Self {
            qty: Some(qty),
            percentage: None,
        }
    }

    pub fn percentage(percentage: Decimal) -> Self {
        Self {
            qty: None,
            percentage: Some(percentage),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match (self.qty, self.percentage) {
            (None, None) => Err(AlpacaError::InvalidRequest(
                "qty or percentage must be given to the close position request".to_string(),
            )),
            (Some(_), Some(_)) => Err(AlpacaError::InvalidRequest(
                "only one of qty or percentage may be given to the close position request"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(qty) = self.qty {
            params.push(("qty", qty.to_string()));
        }
        if let Some(percentage) = self.percentage {
            params.push(("percentage", percentage.to_string()));
        }
        params
    }
}
