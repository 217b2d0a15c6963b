//! Average Basket report rows, totals and rendered output.

use serde::{Deserialize, Serialize};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn per_transaction(amount: f64, transactions: i64) -> f64 {
    if transactions > 0 {
        amount / transactions as f64
    } else {
        0.0
    }
}

/// Year-over-year change in percent; 100 when last year is zero and this year is positive.
pub fn yoy_change_percent(current: f64, last_year: f64) -> f64 {
    if last_year != 0.0 {
        round2((current - last_year) / last_year.abs() * 100.0)
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// One period/group row of the Average Basket report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AverageBasketRow {
    /// Period key such as `2024-05`, `2024-W19` or `2024-05-06`.
    pub period: String,
    pub level1: Option<String>,
    pub level1_value: Option<String>,
    pub level2: Option<String>,
    pub level2_value: Option<String>,

    pub cy_invoice_count: i64,
    pub cy_credit_count: i64,
    pub cy_qty_sold: f64,
    pub cy_qty_returned: f64,
    pub cy_net_sales: f64,
    pub cy_net_returns: f64,
    pub cy_vat_sales: f64,
    pub cy_vat_returns: f64,
    pub cy_gross_sales: f64,
    pub cy_gross_returns: f64,

    pub ly_invoice_count: i64,
    pub ly_credit_count: i64,
    pub ly_net_sales: f64,
    pub ly_net_returns: f64,
    pub ly_vat_sales: f64,
    pub ly_vat_returns: f64,
    pub ly_total_net: f64,
    pub ly_total_gross: f64,
}

impl AverageBasketRow {
    pub fn cy_total_transactions(&self) -> i64 {
        self.cy_invoice_count - self.cy_credit_count
    }

    pub fn cy_total_qty(&self) -> f64 {
        self.cy_qty_sold - self.cy_qty_returned
    }

    pub fn cy_total_net(&self) -> f64 {
        self.cy_net_sales - self.cy_net_returns
    }

    pub fn cy_total_gross(&self) -> f64 {
        self.cy_gross_sales - self.cy_gross_returns
    }

    pub fn cy_average_qty(&self) -> f64 {
        per_transaction(self.cy_total_qty(), self.cy_total_transactions())
    }

    pub fn cy_average_net(&self) -> f64 {
        per_transaction(self.cy_total_net(), self.cy_total_transactions())
    }

    pub fn cy_average_gross(&self) -> f64 {
        per_transaction(self.cy_total_gross(), self.cy_total_transactions())
    }

    pub fn ly_total_transactions(&self) -> i64 {
        self.ly_invoice_count - self.ly_credit_count
    }

    pub fn ly_average_net(&self) -> f64 {
        per_transaction(self.ly_total_net, self.ly_total_transactions())
    }

    pub fn ly_average_gross(&self) -> f64 {
        per_transaction(self.ly_total_gross, self.ly_total_transactions())
    }

    /// YoY on net sales; unlike the totals this divides by the signed last-year value.
    pub fn yoy_change_percent(&self) -> f64 {
        let ly = self.ly_total_net;
        if ly != 0.0 {
            round2((self.cy_total_net() - ly) / ly * 100.0)
        } else if self.cy_total_net() > 0.0 {
            100.0
        } else {
            0.0
        }
    }

    /// Group label of the row, joining both levels when present.
    pub fn group_label(&self) -> Option<String> {
        match (self.level1_value.as_deref(), self.level2_value.as_deref()) {
            (Some(l1), Some(l2)) => Some(format!("{} / {}", l1, l2)),
            (Some(l1), None) => Some(l1.to_string()),
            (None, Some(l2)) => Some(l2.to_string()),
            (None, None) => None,
        }
    }
}

/// Aggregate figures accompanying the report rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportTotals {
    pub total_invoices: i64,
    pub total_credits: i64,
    pub total_qty_sold: f64,
    pub total_qty_returned: f64,
    pub total_net_sales: f64,
    pub total_net_returns: f64,
    pub total_vat_sales: f64,
    pub total_vat_returns: f64,

    pub ly_total_invoices: i64,
    pub ly_total_credits: i64,
    pub ly_net_sales: f64,
    pub ly_net_returns: f64,
    pub ly_vat_sales: f64,
    pub ly_vat_returns: f64,
}

impl ReportTotals {
    /// Sums the raw measures of every row.
    pub fn from_rows(rows: &[AverageBasketRow]) -> Self {
        rows.iter().fold(Self::default(), |mut t, r| {
            t.total_invoices += r.cy_invoice_count;
            t.total_credits += r.cy_credit_count;
            t.total_qty_sold += r.cy_qty_sold;
            t.total_qty_returned += r.cy_qty_returned;
            t.total_net_sales += r.cy_net_sales;
            t.total_net_returns += r.cy_net_returns;
            t.total_vat_sales += r.cy_vat_sales;
            t.total_vat_returns += r.cy_vat_returns;
            t.ly_total_invoices += r.ly_invoice_count;
            t.ly_total_credits += r.ly_credit_count;
            t.ly_net_sales += r.ly_net_sales;
            t.ly_net_returns += r.ly_net_returns;
            t.ly_vat_sales += r.ly_vat_sales;
            t.ly_vat_returns += r.ly_vat_returns;
            t
        })
    }

    pub fn net_transactions(&self) -> i64 {
        self.total_invoices - self.total_credits
    }

    pub fn net_qty(&self) -> f64 {
        self.total_qty_sold - self.total_qty_returned
    }

    pub fn net_sales(&self) -> f64 {
        self.total_net_sales - self.total_net_returns
    }

    pub fn gross_sales(&self) -> f64 {
        self.net_sales() + (self.total_vat_sales - self.total_vat_returns)
    }

    pub fn average_basket_net(&self) -> f64 {
        per_transaction(self.net_sales(), self.net_transactions())
    }

    pub fn average_basket_gross(&self) -> f64 {
        per_transaction(self.gross_sales(), self.net_transactions())
    }

    pub fn average_qty(&self) -> f64 {
        per_transaction(self.net_qty(), self.net_transactions())
    }

    pub fn ly_net_transactions(&self) -> i64 {
        self.ly_total_invoices - self.ly_total_credits
    }

    pub fn ly_total_net(&self) -> f64 {
        self.ly_net_sales - self.ly_net_returns
    }

    pub fn ly_total_gross(&self) -> f64 {
        self.ly_total_net() + (self.ly_vat_sales - self.ly_vat_returns)
    }

    pub fn ly_average_basket_net(&self) -> f64 {
        per_transaction(self.ly_total_net(), self.ly_net_transactions())
    }

    pub fn ly_average_basket_gross(&self) -> f64 {
        per_transaction(self.ly_total_gross(), self.ly_net_transactions())
    }

    pub fn yoy_change_percent(&self) -> f64 {
        yoy_change_percent(self.net_sales(), self.ly_total_net())
    }
}

/// Rows and totals produced by a report engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOutput {
    pub rows: Vec<AverageBasketRow>,
    pub totals: ReportTotals,
}

/// A rendered document ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}
