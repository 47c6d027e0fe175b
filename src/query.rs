use uuid::Uuid;

use crate::retailers::repo::BusinessType;
use crate::store::{Clause, Predicate, Sort, Window};

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Normalized pagination window. Invalid or missing values never error; they
/// fall back to page 1 / limit 20, with the limit capped at 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn window(&self) -> Window {
        Window {
            skip: self.skip(),
            limit: Some(self.limit),
            sort: None,
        }
    }

    pub fn window_sorted(&self, sort: Sort) -> Window {
        Window {
            skip: self.skip(),
            limit: Some(self.limit),
            sort: Some(sort),
        }
    }

    /// Total page count for a result set of `total` records.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .map(|v| v as u64)
}

fn trimmed(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

/// Lenient numeric parse: anything non-numeric is ignored, not an error.
fn numeric(raw: Option<&str>) -> Option<f64> {
    trimmed(raw).and_then(|v| v.parse::<f64>().ok())
}

/// Direct product listing filter: whole-field matches plus a price range.
pub fn product_filter(
    city: Option<&str>,
    area: Option<&str>,
    category: Option<&str>,
    min_price: Option<&str>,
    max_price: Option<&str>,
) -> Predicate {
    let mut filter = Predicate::new();
    if let Some(city) = trimmed(city) {
        filter.push(Clause::FieldEq("city", city.to_string()));
    }
    if let Some(area) = trimmed(area) {
        filter.push(Clause::FieldEq("area", area.to_string()));
    }
    if let Some(category) = trimmed(category) {
        filter.push(Clause::FieldEq("category", category.to_string()));
    }
    if let Some(min) = numeric(min_price) {
        filter.push(Clause::NumGte("price", min));
    }
    if let Some(max) = numeric(max_price) {
        filter.push(Clause::NumLte("price", max));
    }
    filter
}

/// Product-side filter for the cross-entity offers filter: anchored
/// case-insensitive matches on category, brand and name. `None` when no
/// product attribute was supplied.
pub fn product_match_filter(
    category: Option<&str>,
    brand: Option<&str>,
    name: Option<&str>,
) -> Option<Predicate> {
    let mut filter = Predicate::new();
    if let Some(category) = trimmed(category) {
        filter.push(Clause::FieldEq("category", category.to_string()));
    }
    if let Some(brand) = trimmed(brand) {
        filter.push(Clause::FieldEq("brand", brand.to_string()));
    }
    if let Some(name) = trimmed(name) {
        filter.push(Clause::FieldEq("name", name.to_string()));
    }
    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

/// Free-text product search across name, brand and category.
pub fn product_search(query: &str) -> Predicate {
    Predicate::new().with(Clause::AnyOf(vec![
        Clause::FieldContains("name", query.to_string()),
        Clause::FieldContains("brand", query.to_string()),
        Clause::FieldContains("category", query.to_string()),
    ]))
}

/// Direct offer listing filter (both params optional).
pub fn offer_filter(city: Option<&str>, area: Option<&str>) -> Predicate {
    let mut filter = Predicate::new();
    if let Some(city) = trimmed(city) {
        filter.push(Clause::FieldEq("city", city.to_string()));
    }
    if let Some(area) = trimmed(area) {
        filter.push(Clause::FieldEq("area", area.to_string()));
    }
    filter
}

/// Locality scope for offer search: substring matches, unlike the anchored
/// matches of the direct filters. The two modes are deliberately distinct.
pub fn offer_search_scope(city: &str, area: Option<&str>) -> Predicate {
    let mut filter = Predicate::new().with(Clause::FieldContains("city", city.to_string()));
    if let Some(area) = trimmed(area) {
        filter.push(Clause::FieldContains("area", area.to_string()));
    }
    filter
}

/// Restrict a filter to offers referencing one of the given products.
pub fn with_product_ids(mut filter: Predicate, ids: Vec<Uuid>) -> Predicate {
    filter.push(Clause::IdIn("productId", ids));
    filter
}

/// Retailer listing filter. Unknown businessType values and malformed
/// ownerId values are ignored rather than rejected.
pub fn retailer_filter(
    business_type: Option<&str>,
    owner_id: Option<&str>,
    q: Option<&str>,
) -> Predicate {
    let mut filter = Predicate::new();
    if let Some(bt) = trimmed(business_type).and_then(BusinessType::parse) {
        filter.push(Clause::FieldIs("businessType", bt.as_str().to_string()));
    }
    if let Some(owner) = trimmed(owner_id).and_then(|v| Uuid::parse_str(v).ok()) {
        filter.push(Clause::IdEq("ownerId", owner));
    }
    if let Some(q) = trimmed(q) {
        filter.push(Clause::FieldContains("shopName", q.to_string()));
    }
    filter
}

/// Free-text retailer search across shopName, businessType and description.
pub fn retailer_search(query: &str) -> Predicate {
    Predicate::new().with(Clause::AnyOf(vec![
        Clause::FieldContains("shopName", query.to_string()),
        Clause::FieldContains("businessType", query.to_string()),
        Clause::FieldContains("description", query.to_string()),
    ]))
}
