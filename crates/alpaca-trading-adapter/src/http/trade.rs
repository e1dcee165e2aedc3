/*
[INPUT]:  Order requests and order identifiers
[OUTPUT]: Order entities and cancellation results
[POS]:    HTTP layer - order endpoints (require API key or OAuth)
[UPDATE]: When adding new order endpoints or changing order flow
*/

use reqwest::Method;
use uuid::Uuid;

use crate::http::{AlpacaClient, Result};
use crate::types::{CancelOrderResponse, GetOrdersRequest, Order, OrderRequest};

impl AlpacaClient {
    /// Submit a new order
    ///
    /// POST /v2/orders
    pub async fn submit_order(&self, req: &OrderRequest) -> Result<Order> {
        req.validate()?;
        let builder = self.request(Method::POST, "/orders")?.json(req);
        self.send_json(builder).await
    }

    /// List orders matching the filters
    ///
    /// GET /v2/orders?status={status}&limit={limit}&symbols={symbols}...
    pub async fn get_orders(&self, filter: &GetOrdersRequest) -> Result<Vec<Order>> {
        let builder = self
            .request(Method::GET, "/orders")?
            .query(&filter.to_query());
        self.send_json(builder).await
    }

    /// Fetch one order by its server id
    ///
    /// GET /v2/orders/{order_id}?nested={nested}
    pub async fn get_order_by_id(&self, order_id: Uuid, nested: bool) -> Result<Order> {
        let endpoint = format!("/orders/{order_id}");
        let builder = self
            .request(Method::GET, &endpoint)?
            .query(&[("nested", nested.to_string())]);
        self.send_json(builder).await
    }

    /// Fetch one order by the client-assigned id
    ///
    /// GET /v2/orders:by_client_order_id?client_order_id={client_order_id}
    pub async fn get_order_by_client_id(&self, client_order_id: &str) -> Result<Order> {
        let builder = self
            .request(Method::GET, "/orders:by_client_order_id")?
            .query(&[("client_order_id", client_order_id)]);
        self.send_json(builder).await
    }

    /// Cancel every open order
    ///
    /// DELETE /v2/orders
    pub async fn cancel_orders(&self) -> Result<Vec<CancelOrderResponse>> {
        let builder = self.request(Method::DELETE, "/orders")?;
        self.send_json(builder).await
    }

    /// Cancel one order
    ///
    /// DELETE /v2/orders/{order_id}
    pub async fn cancel_order_by_id(&self, order_id: Uuid) -> Result<()> {
        let endpoint = format!("/orders/{order_id}");
        let builder = self.request(Method::DELETE, &endpoint)?;
        self.send_empty(builder).await
    }
}
