//! Aggregated sales row of the Average Basket query.

use sqlx::FromRow;

/// One (period, level1, level2) bucket of invoices and credit notes.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct AverageBasketAggregateEntity {
    pub period: String,
    pub level1_value: Option<String>,
    pub level2_value: Option<String>,
    pub invoice_count: i64,
    pub credit_count: i64,
    pub qty_sold: f64,
    pub qty_returned: f64,
    pub net_sales: f64,
    pub net_returns: f64,
    pub vat_sales: f64,
    pub vat_returns: f64,
}
