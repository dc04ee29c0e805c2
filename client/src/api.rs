//! Typed access to the storefront backend.
//!
//! Every payload is decoded into its canonical `lastcall-common` type here, at
//! the boundary, so nothing downstream has to second-guess response shapes.

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use lastcall_common::cart::Cart;
use lastcall_common::health::HealthAnalysis;
use lastcall_common::order::{NewOrder, Order, OrderEnvelope, OrderId, OrdersEnvelope, PlacedOrder};
use lastcall_common::product::{Product, ProductId};
use lastcall_common::sales::SalesReport;

use crate::config::ClientConfig;
use crate::error::{LoadError, Result};
use crate::profile::UserProfile;

/// Source of product pages for an inventory session.
pub trait ProductSource: Clone + Send + Sync + 'static {
    /// Fetch one page (1-based) of at most `limit` products.
    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Product>>> + Send;
}

/// Which admin order list to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOrders {
    /// Orders placed today, awaiting confirmation.
    Today,
    /// Orders already confirmed.
    Confirmed,
}

impl AdminOrders {
    fn path(self) -> &'static str {
        match self {
            AdminOrders::Today => "/api/orders/admin/orders",
            AdminOrders::Confirmed => "/api/orders/admin/confirmed",
        }
    }
}

/// HTTP client for the storefront API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.config.url(path);
        debug!("GET {url} {query:?}");
        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// One page of products, newest first as ordered by the backend.
    pub async fn fetch_products_page(&self, page: u32, limit: u32) -> Result<Vec<Product>> {
        self.get_json(
            "/api/products/all",
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Walk every page until one comes back shorter than the page size.
    pub async fn fetch_all_products(&self) -> Result<Vec<Product>> {
        let limit = self.config.page_size.max(1);
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_products_page(page, limit).await?;
            let short = batch.len() < limit as usize;
            all.extend(batch);
            if short {
                break;
            }
            page += 1;
        }
        info!("Loaded {} products over {} page(s)", all.len(), page);
        Ok(all)
    }

    /// Orders placed by one user.
    pub async fn user_orders(&self, user_id: u64) -> Result<Vec<Order>> {
        let envelope: OrdersEnvelope = self
            .get_json(&format!("/api/orders/user/{user_id}"), &[])
            .await?;
        if !envelope.success {
            return Err(LoadError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "orders unavailable".to_string()),
            ));
        }
        Ok(envelope.orders)
    }

    pub async fn admin_orders(&self, which: AdminOrders) -> Result<Vec<Order>> {
        let envelope: OrdersEnvelope = self.get_json(which.path(), &[]).await?;
        Ok(envelope.orders)
    }

    pub async fn order_details(&self, id: OrderId) -> Result<Order> {
        let envelope: OrderEnvelope = self
            .get_json(&format!("/api/orders/details/{id}"), &[])
            .await?;
        match envelope.order {
            Some(order) if envelope.success => Ok(order),
            _ => Err(LoadError::NotFound(
                envelope
                    .message
                    .unwrap_or_else(|| format!("order {id}")),
            )),
        }
    }

    /// Place an order for everything in `cart`, delivered to `profile`.
    pub async fn create_order(
        &self,
        cart: &Cart,
        profile: &UserProfile,
        payment_method: &str,
    ) -> Result<OrderId> {
        let order = NewOrder::from_cart(cart, profile.customer(), payment_method)
            .ok_or_else(|| LoadError::Rejected("cart is empty".to_string()))?;
        let url = self.config.url("/api/orders/create");
        debug!("POST {url} ({} line(s))", order.items.len());
        let resp = self.http.post(&url).json(&order).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        let placed: PlacedOrder = serde_json::from_slice(&body)?;
        match placed.order_id {
            Some(id) if placed.success => {
                info!("Placed order {id} for {}", order.total_amount);
                Ok(id)
            }
            _ => Err(LoadError::Rejected(
                placed
                    .message
                    .unwrap_or_else(|| "order was not placed".to_string()),
            )),
        }
    }

    /// AI health analysis of one product.
    pub async fn analyze_product(&self, id: ProductId) -> Result<HealthAnalysis> {
        let analysis: HealthAnalysis = self.get_json(&format!("/api/ai/analyze/{id}"), &[]).await?;
        if !analysis.success {
            return Err(LoadError::Rejected(
                analysis
                    .message
                    .unwrap_or_else(|| "failed to analyze product".to_string()),
            ));
        }
        Ok(analysis)
    }

    /// Mark an order as delivered (admin).
    pub async fn confirm_delivery(&self, id: OrderId) -> Result<()> {
        let url = self.config.url(&format!("/api/orders/admin/confirm/{id}"));
        debug!("PUT {url}");
        let resp = self.http.put(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        info!("Confirmed delivery of order {id}");
        Ok(())
    }

    pub async fn sales_report(&self) -> Result<SalesReport> {
        self.get_json("/api/orders/admin/sales-report", &[]).await
    }
}

impl ProductSource for ApiClient {
    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Product>>> + Send {
        self.fetch_products_page(page, limit)
    }
}
