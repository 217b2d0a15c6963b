//! Average Basket report engine over a tenant's sales tables.
//!
//! Current and last-year figures come from the same aggregate query; the
//! last-year pass shifts document dates forward one year so both passes share
//! period keys. Rows are merged, sorted and totalled in memory.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use sqlx::PgPool;

use domain::models::schedule::AVERAGE_BASKET;
use domain::models::{
    AverageBasketRow, Breakdown, GroupBy, ReportFilter, ReportOutput, ReportTotals, SortColumn,
    SortDirection,
};
use domain::services::{ReportEngine, ReportError};

use crate::entities::AverageBasketAggregateEntity;
use crate::metrics::QueryTimer;

/// Period key format of a breakdown, as a Postgres `to_char` pattern.
fn period_format(breakdown: Breakdown) -> &'static str {
    match breakdown {
        Breakdown::Daily => "YYYY-MM-DD",
        Breakdown::Weekly => r#"IYYY-"W"IW"#,
        Breakdown::Monthly => "YYYY-MM",
    }
}

/// Column expression of a grouping dimension.
fn group_expression(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::None => "NULL::text",
        GroupBy::Store => "COALESCE(s.store_name, d.store_code)",
        GroupBy::Category => "COALESCE(i.category, 'N/A')",
        GroupBy::Department => "COALESCE(i.department, 'N/A')",
        GroupBy::Brand => "COALESCE(i.brand, 'N/A')",
        GroupBy::Season => "COALESCE(i.season, 'N/A')",
        GroupBy::Customer => "COALESCE(d.customer_name, d.customer_code, 'N/A')",
        GroupBy::User => "COALESCE(d.user_code, 'N/A')",
    }
}

fn aggregate_query(filter: &ReportFilter) -> String {
    format!(
        r#"
        SELECT
            to_char(d.doc_date + ($3::int * INTERVAL '1 year'), '{period}') AS period,
            {level1} AS level1_value,
            {level2} AS level2_value,
            (COUNT(DISTINCT d.doc_id) FILTER (WHERE d.doc_type = 'I'))::bigint AS invoice_count,
            (COUNT(DISTINCT d.doc_id) FILTER (WHERE d.doc_type = 'C'))::bigint AS credit_count,
            COALESCE(SUM(l.quantity) FILTER (WHERE d.doc_type = 'I'), 0)::float8 AS qty_sold,
            COALESCE(SUM(l.quantity) FILTER (WHERE d.doc_type = 'C'), 0)::float8 AS qty_returned,
            COALESCE(SUM(l.net_amount) FILTER (WHERE d.doc_type = 'I'), 0)::float8 AS net_sales,
            COALESCE(SUM(l.net_amount) FILTER (WHERE d.doc_type = 'C'), 0)::float8 AS net_returns,
            COALESCE(SUM(l.vat_amount) FILTER (WHERE d.doc_type = 'I'), 0)::float8 AS vat_sales,
            COALESCE(SUM(l.vat_amount) FILTER (WHERE d.doc_type = 'C'), 0)::float8 AS vat_returns
        FROM sales_documents d
        INNER JOIN sales_document_lines l ON l.doc_id = d.doc_id
        LEFT JOIN items i ON i.item_id = l.item_id
        LEFT JOIN stores s ON s.store_code = d.store_code
        WHERE d.doc_date BETWEEN $1 AND $2
          AND (cardinality($4::text[]) = 0 OR d.store_code = ANY($4))
          AND (cardinality($5::bigint[]) = 0 OR l.item_id = ANY($5))
        GROUP BY 1, 2, 3
        "#,
        period = period_format(filter.breakdown),
        level1 = group_expression(filter.group_by),
        level2 = group_expression(filter.secondary_group_by),
    )
}

type RowKey = (String, Option<String>, Option<String>);

fn key_of(entity: &AverageBasketAggregateEntity) -> RowKey {
    (
        entity.period.clone(),
        entity.level1_value.clone(),
        entity.level2_value.clone(),
    )
}

/// Builds report rows from current-year buckets, attaching matching last-year buckets.
pub fn merge_rows(
    filter: &ReportFilter,
    current: Vec<AverageBasketAggregateEntity>,
    last_year: Vec<AverageBasketAggregateEntity>,
) -> Vec<AverageBasketRow> {
    let last_year: HashMap<RowKey, AverageBasketAggregateEntity> =
        last_year.into_iter().map(|e| (key_of(&e), e)).collect();
    let level = |g: GroupBy| (!g.is_none()).then(|| g.as_str().to_string());

    current
        .into_iter()
        .map(|cy| {
            let ly = last_year.get(&key_of(&cy)).cloned().unwrap_or_default();
            let ly_total_net = ly.net_sales - ly.net_returns;
            AverageBasketRow {
                level1: level(filter.group_by),
                level2: level(filter.secondary_group_by),
                cy_invoice_count: cy.invoice_count,
                cy_credit_count: cy.credit_count,
                cy_qty_sold: cy.qty_sold,
                cy_qty_returned: cy.qty_returned,
                cy_net_sales: cy.net_sales,
                cy_net_returns: cy.net_returns,
                cy_vat_sales: cy.vat_sales,
                cy_vat_returns: cy.vat_returns,
                cy_gross_sales: cy.net_sales + cy.vat_sales,
                cy_gross_returns: cy.net_returns + cy.vat_returns,
                ly_invoice_count: ly.invoice_count,
                ly_credit_count: ly.credit_count,
                ly_net_sales: ly.net_sales,
                ly_net_returns: ly.net_returns,
                ly_vat_sales: ly.vat_sales,
                ly_vat_returns: ly.vat_returns,
                ly_total_net,
                ly_total_gross: ly_total_net + (ly.vat_sales - ly.vat_returns),
                period: cy.period,
                level1_value: cy.level1_value,
                level2_value: cy.level2_value,
            }
        })
        .collect()
}

fn sales_value(row: &AverageBasketRow, include_vat: bool) -> f64 {
    if include_vat {
        row.cy_total_gross()
    } else {
        row.cy_total_net()
    }
}

fn basket_value(row: &AverageBasketRow, include_vat: bool) -> f64 {
    if include_vat {
        row.cy_average_gross()
    } else {
        row.cy_average_net()
    }
}

fn compare_by(column: SortColumn, include_vat: bool, a: &AverageBasketRow, b: &AverageBasketRow) -> Ordering {
    let num = |x: f64, y: f64| x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    match column {
        SortColumn::Period => a.period.cmp(&b.period),
        SortColumn::GroupName => a.group_label().cmp(&b.group_label()),
        SortColumn::Invoices => a.cy_invoice_count.cmp(&b.cy_invoice_count),
        SortColumn::Returns => a.cy_credit_count.cmp(&b.cy_credit_count),
        SortColumn::NetTransactions => a.cy_total_transactions().cmp(&b.cy_total_transactions()),
        SortColumn::QtySold => num(a.cy_qty_sold, b.cy_qty_sold),
        SortColumn::QtyReturned => num(a.cy_qty_returned, b.cy_qty_returned),
        SortColumn::NetQty => num(a.cy_total_qty(), b.cy_total_qty()),
        SortColumn::Sales => num(sales_value(a, include_vat), sales_value(b, include_vat)),
        SortColumn::AvgBasket => num(basket_value(a, include_vat), basket_value(b, include_vat)),
        SortColumn::AvgQty => num(a.cy_average_qty(), b.cy_average_qty()),
    }
}

/// Sorts rows by the filter's column and direction; ties fall back to period
/// then group label, ascending.
pub fn sort_rows(rows: &mut [AverageBasketRow], filter: &ReportFilter) {
    rows.sort_by(|a, b| {
        let primary = compare_by(filter.sort_column, filter.include_vat, a, b);
        let primary = match filter.sort_direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.period.cmp(&b.period))
            .then_with(|| a.group_label().cmp(&b.group_label()))
    });
}

/// Average Basket report engine bound to one tenant pool.
#[derive(Clone)]
pub struct AverageBasketRepository {
    pool: PgPool,
}

impl AverageBasketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_buckets(
        &self,
        filter: &ReportFilter,
        from: NaiveDate,
        to: NaiveDate,
        year_shift: i32,
    ) -> Result<Vec<AverageBasketAggregateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("average_basket_buckets");
        let sql = aggregate_query(filter);
        let result = sqlx::query_as::<_, AverageBasketAggregateEntity>(&sql)
            .bind(from)
            .bind(to)
            .bind(year_shift)
            .bind(&filter.store_codes)
            .bind(&filter.item_ids)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl ReportEngine for AverageBasketRepository {
    async fn generate(&self, report_type: &str, filter: &ReportFilter) -> Result<ReportOutput, ReportError> {
        if !report_type.eq_ignore_ascii_case(AVERAGE_BASKET) {
            return Err(ReportError::UnsupportedReportType(report_type.to_string()));
        }

        let query_error = |e: sqlx::Error| ReportError::Query(e.to_string());
        let current = self
            .fetch_buckets(filter, filter.date_from, filter.date_to, 0)
            .await
            .map_err(query_error)?;

        let last_year = if filter.compare_last_year {
            match (
                filter.date_from.checked_sub_months(Months::new(12)),
                filter.date_to.checked_sub_months(Months::new(12)),
            ) {
                (Some(from), Some(to)) => self
                    .fetch_buckets(filter, from, to, 1)
                    .await
                    .map_err(query_error)?,
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let mut rows = merge_rows(filter, current, last_year);
        sort_rows(&mut rows, filter);
        let totals = ReportTotals::from_rows(&rows);

        tracing::debug!(
            rows = rows.len(),
            from = %filter.date_from,
            to = %filter.date_to,
            "Average basket report generated"
        );

        Ok(ReportOutput { rows, totals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ScheduleParameters;

    fn filter(params: ScheduleParameters) -> ReportFilter {
        ReportFilter::from_parameters(
            &params,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    fn bucket(period: &str, group: Option<&str>, invoices: i64, net: f64) -> AverageBasketAggregateEntity {
        AverageBasketAggregateEntity {
            period: period.to_string(),
            level1_value: group.map(str::to_string),
            invoice_count: invoices,
            net_sales: net,
            vat_sales: net * 0.19,
            ..Default::default()
        }
    }

    #[test]
    fn test_query_uses_whitelisted_expressions() {
        let sql = aggregate_query(&filter(ScheduleParameters {
            breakdown: Breakdown::Weekly,
            group_by: GroupBy::Store,
            ..Default::default()
        }));
        assert!(sql.contains(r#"'IYYY-"W"IW'"#));
        assert!(sql.contains("COALESCE(s.store_name, d.store_code) AS level1_value"));
        assert!(sql.contains("NULL::text AS level2_value"));
    }

    #[test]
    fn test_merge_attaches_last_year_by_key() {
        let f = filter(ScheduleParameters {
            group_by: GroupBy::Store,
            compare_last_year: true,
            ..Default::default()
        });
        let current = vec![
            bucket("2024-01", Some("North"), 10, 1000.0),
            bucket("2024-01", Some("South"), 5, 400.0),
        ];
        let last_year = vec![
            bucket("2024-01", Some("North"), 8, 800.0),
            bucket("2024-02", Some("North"), 1, 1.0),
        ];

        let rows = merge_rows(&f, current, last_year);
        assert_eq!(rows.len(), 2);
        let north = &rows[0];
        assert_eq!(north.level1.as_deref(), Some("Store"));
        assert_eq!(north.level2, None);
        assert_eq!(north.ly_invoice_count, 8);
        assert_eq!(north.ly_total_net, 800.0);
        assert_eq!(north.yoy_change_percent(), 25.0);
        assert_eq!(north.cy_gross_sales, 1190.0);
        let south = &rows[1];
        assert_eq!(south.ly_invoice_count, 0);
        assert_eq!(south.yoy_change_percent(), 100.0);
    }

    #[test]
    fn test_sort_rows_default_is_period_then_group() {
        let f = filter(ScheduleParameters::default());
        let mut rows = merge_rows(
            &f,
            vec![
                bucket("2024-02", Some("B"), 1, 1.0),
                bucket("2024-01", Some("B"), 1, 1.0),
                bucket("2024-01", Some("A"), 1, 1.0),
            ],
            vec![],
        );
        sort_rows(&mut rows, &f);
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.period.as_str(), r.level1_value.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![("2024-01", Some("A")), ("2024-01", Some("B")), ("2024-02", Some("B"))]
        );
    }

    #[test]
    fn test_sort_rows_by_sales_descending() {
        let f = filter(ScheduleParameters {
            sort_column: SortColumn::Sales,
            sort_direction: SortDirection::Desc,
            ..Default::default()
        });
        let mut rows = merge_rows(
            &f,
            vec![
                bucket("2024-01", None, 1, 10.0),
                bucket("2024-02", None, 1, 30.0),
                bucket("2024-03", None, 1, 20.0),
            ],
            vec![],
        );
        sort_rows(&mut rows, &f);
        let periods: Vec<_> = rows.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-02", "2024-03", "2024-01"]);
    }
}
