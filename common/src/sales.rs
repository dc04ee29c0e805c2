use serde::{Deserialize, Serialize};

use crate::currency::Money;
use crate::wire;

/// Headline numbers of the admin sales report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    #[serde(default)]
    pub total_sales: Money,
    #[serde(default, deserialize_with = "wire::count")]
    pub total_orders: u64,
    #[serde(default, deserialize_with = "wire::count")]
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: String,
    #[serde(default)]
    pub daily_sales: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    /// `YYYY-MM`.
    pub month: String,
    #[serde(default)]
    pub monthly_sales: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSeller {
    pub product_name: String,
    #[serde(default, deserialize_with = "wire::count")]
    pub total_sold: u64,
}

/// Sales report served to the admin dashboard. Every section may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    #[serde(default)]
    pub summary: SalesSummary,
    #[serde(default)]
    pub daily_sales: Vec<DailySales>,
    #[serde(default)]
    pub monthly_sales: Vec<MonthlySales>,
    #[serde(default)]
    pub best_selling_products: Vec<BestSeller>,
}

impl SalesReport {
    /// Average order value; zero when there are no orders.
    pub fn average_order_value(&self) -> Money {
        match self.summary.total_orders {
            0 => Money::ZERO,
            n => Money::from_cents(self.summary.total_sales.cents() / n),
        }
    }

    /// The last `n` months, oldest first, as charted on the dashboard.
    pub fn recent_months(&self, n: usize) -> &[MonthlySales] {
        let start = self.monthly_sales.len().saturating_sub(n);
        &self.monthly_sales[start..]
    }
}
