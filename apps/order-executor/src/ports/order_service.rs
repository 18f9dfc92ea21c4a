//! Order placement port.

use async_trait::async_trait;

use crate::domain::{CancelAck, OrderRequest, OrderResponse, ReplaceOrderRequest};

use super::BrokerError;

/// Venue order service.
///
/// Implementations must be cheap to share across tasks; the executors hold
/// them behind an `Arc`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Submit a buy order.
    async fn submit_buy(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError>;

    /// Submit a sell order.
    async fn submit_sell(&self, request: OrderRequest) -> Result<OrderResponse, BrokerError>;

    /// Cancel a resting order.
    async fn cancel_order(&self, account_id: &str, order_id: &str)
    -> Result<CancelAck, BrokerError>;

    /// Replace the price of a resting order.
    ///
    /// The venue assigns a new order id, returned in the response.
    async fn replace_order(
        &self,
        request: ReplaceOrderRequest,
    ) -> Result<OrderResponse, BrokerError>;
}
