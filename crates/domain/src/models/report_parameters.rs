//! Stored report parameters and the resolved report filter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::date_range::RelativeDateRange;
use super::json_doc::{as_int, field};

/// Period granularity of report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Breakdown {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Breakdown {
    const ALL: [Breakdown; 3] = [Breakdown::Daily, Breakdown::Weekly, Breakdown::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

/// Grouping dimension of report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroupBy {
    #[default]
    None,
    Store,
    Category,
    Department,
    Brand,
    Season,
    Customer,
    User,
}

impl GroupBy {
    const ALL: [GroupBy; 8] = [
        GroupBy::None,
        GroupBy::Store,
        GroupBy::Category,
        GroupBy::Department,
        GroupBy::Brand,
        GroupBy::Season,
        GroupBy::Customer,
        GroupBy::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Store => "Store",
            Self::Category => "Category",
            Self::Department => "Department",
            Self::Brand => "Brand",
            Self::Season => "Season",
            Self::Customer => "Customer",
            Self::User => "User",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Column a report may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortColumn {
    #[default]
    Period,
    GroupName,
    Invoices,
    Returns,
    NetTransactions,
    QtySold,
    QtyReturned,
    NetQty,
    Sales,
    AvgBasket,
    AvgQty,
}

impl SortColumn {
    const ALL: [SortColumn; 11] = [
        SortColumn::Period,
        SortColumn::GroupName,
        SortColumn::Invoices,
        SortColumn::Returns,
        SortColumn::NetTransactions,
        SortColumn::QtySold,
        SortColumn::QtyReturned,
        SortColumn::NetQty,
        SortColumn::Sales,
        SortColumn::AvgBasket,
        SortColumn::AvgQty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Period => "Period",
            Self::GroupName => "GroupName",
            Self::Invoices => "Invoices",
            Self::Returns => "Returns",
            Self::NetTransactions => "NetTransactions",
            Self::QtySold => "QtySold",
            Self::QtyReturned => "QtyReturned",
            Self::NetQty => "NetQty",
            Self::Sales => "Sales",
            Self::AvgBasket => "AvgBasket",
            Self::AvgQty => "AvgQty",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Reads an enum stored as its index (number or numeric string) or its name.
fn parse_indexed<T: Copy>(value: &Value, all: &[T], name: impl Fn(&T) -> &'static str) -> Option<T> {
    if let Some(index) = as_int(value) {
        return usize::try_from(index).ok().and_then(|i| all.get(i).copied());
    }
    let text = value.as_str()?.trim();
    all.iter().copied().find(|v| name(v).eq_ignore_ascii_case(text))
}

fn parse_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_int_list(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_int).collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Report parameters as stored on a schedule.
///
/// Parsing never fails: malformed or missing values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    pub breakdown: Breakdown,
    pub group_by: GroupBy,
    pub secondary_group_by: GroupBy,
    pub include_vat: bool,
    pub compare_last_year: bool,
    pub store_codes: Vec<String>,
    pub item_ids: Vec<i64>,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    /// `None` resolves as the default 30-day window.
    pub date_range: Option<RelativeDateRange>,
}

impl ScheduleParameters {
    /// Parses a stored parameters document.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => Self::from_object(&obj),
            _ => Self::default(),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let is_true = |names: &[&str]| matches!(field(obj, names), Some(Value::Bool(true)));

        Self {
            breakdown: field(obj, &["breakdown"])
                .and_then(|v| parse_indexed(v, &Breakdown::ALL, Breakdown::as_str))
                .unwrap_or(defaults.breakdown),
            group_by: field(obj, &["groupBy"])
                .and_then(|v| parse_indexed(v, &GroupBy::ALL, GroupBy::as_str))
                .unwrap_or_default(),
            secondary_group_by: field(obj, &["secondaryGroupBy"])
                .and_then(|v| parse_indexed(v, &GroupBy::ALL, GroupBy::as_str))
                .unwrap_or_default(),
            include_vat: is_true(&["includeVat"]),
            compare_last_year: is_true(&["compareLastYear"]),
            store_codes: field(obj, &["storeCodes"])
                .map(parse_string_list)
                .unwrap_or_default(),
            item_ids: field(obj, &["itemIds"])
                .map(parse_int_list)
                .unwrap_or_default(),
            sort_column: field(obj, &["sortColumn"])
                .and_then(Value::as_str)
                .and_then(SortColumn::parse)
                .unwrap_or_default(),
            sort_direction: field(obj, &["sortDirection"])
                .and_then(Value::as_str)
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
            date_range: field(obj, &["reportDateRange", "dateRange"])
                .and_then(RelativeDateRange::from_document),
        }
    }
}

/// Fully resolved filter handed to the report engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub breakdown: Breakdown,
    pub group_by: GroupBy,
    pub secondary_group_by: GroupBy,
    pub include_vat: bool,
    pub compare_last_year: bool,
    pub store_codes: Vec<String>,
    pub item_ids: Vec<i64>,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
}

impl ReportFilter {
    /// Binds stored parameters to concrete calendar bounds.
    pub fn from_parameters(params: &ScheduleParameters, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            breakdown: params.breakdown,
            group_by: params.group_by,
            secondary_group_by: params.secondary_group_by,
            include_vat: params.include_vat,
            compare_last_year: params.compare_last_year,
            store_codes: params.store_codes.clone(),
            item_ids: params.item_ids.clone(),
            sort_column: params.sort_column,
            sort_direction: params.sort_direction,
        }
    }
}
