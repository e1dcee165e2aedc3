/*
[INPUT]:  Account-scoped queries and position identifiers
[OUTPUT]: Account, market clock and position data
[POS]:    HTTP layer - account and position endpoints (require API key or OAuth)
[UPDATE]: When adding new account endpoints or changing query parameters
*/

use reqwest::Method;

use crate::http::{AlpacaClient, Result};
use crate::types::{Clock, ClosePositionRequest, Order, Position, TradeAccount};

impl AlpacaClient {
    /// GET /v2/account
    pub async fn get_account(&self) -> Result<TradeAccount> {
        let builder = self.request(Method::GET, "/account")?;
        self.send_json(builder).await
    }

    /// GET /v2/clock
    pub async fn get_clock(&self) -> Result<Clock> {
        let builder = self.request(Method::GET, "/clock")?;
        self.send_json(builder).await
    }

    /// GET /v2/positions
    pub async fn get_all_positions(&self) -> Result<Vec<Position>> {
        let builder = self.request(Method::GET, "/positions")?;
        self.send_json(builder).await
    }

    /// Open position for a symbol or asset id
    ///
    /// GET /v2/positions/{symbol_or_asset_id}
    pub async fn get_open_position(&self, symbol_or_asset_id: &str) -> Result<Position> {
        let endpoint = format!("/positions/{symbol_or_asset_id}");
        let builder = self.request(Method::GET, &endpoint)?;
        self.send_json(builder).await
    }

    /// Liquidate a position, fully when `req` is `None`
    ///
    /// DELETE /v2/positions/{symbol_or_asset_id}?qty={qty}|percentage={percentage}
    pub async fn close_position(
        &self,
        symbol_or_asset_id: &str,
        req: Option<&ClosePositionRequest>,
    ) -> Result<Order> {
        let endpoint = format!("/positions/{symbol_or_asset_id}");
        let mut builder = self.request(Method::DELETE, &endpoint)?;
        if let Some(req) = req {
            req.validate()?;
            builder = builder.query(&req.to_query());
        }
        self.send_json(builder).await
    }
}
