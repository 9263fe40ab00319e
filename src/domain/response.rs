//! Service response wrappers
//!
//! Every document call reports a request charge, the service's cost unit.
//! These types carry it next to the payload so workflows can log and sum it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Request charge billed for one or more service calls
///
/// # Examples
///
/// ```
/// use azlearn::domain::response::RequestCharge;
///
/// let total = RequestCharge::new(5.71) + RequestCharge::new(1.0);
/// assert_eq!(total.to_string(), "6.71 RUs");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestCharge(f64);

impl RequestCharge {
    /// Zero charge
    pub const ZERO: RequestCharge = RequestCharge(0.0);

    /// Wraps a raw charge value
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw charge value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Add for RequestCharge {
    type Output = RequestCharge;

    fn add(self, rhs: Self) -> Self::Output {
        RequestCharge(self.0 + rhs.0)
    }
}

impl AddAssign for RequestCharge {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for RequestCharge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(RequestCharge::ZERO, |acc, c| acc + c)
    }
}

impl From<f64> for RequestCharge {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round away float noise from summed charges
        let rounded = (self.0 * 100.0).round() / 100.0;
        write!(f, "{rounded} RUs")
    }
}

/// Result of a point operation on a single item
#[derive(Debug, Clone)]
pub struct ItemResponse<T> {
    /// The item as stored by the service after the call
    pub resource: T,

    /// Charge for this call
    pub request_charge: RequestCharge,

    /// HTTP status reported by the service
    pub status_code: u16,
}

impl<T> ItemResponse<T> {
    /// Creates a response
    pub fn new(resource: T, request_charge: RequestCharge, status_code: u16) -> Self {
        Self {
            resource,
            request_charge,
            status_code,
        }
    }

    /// Maps the resource, keeping charge and status
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ItemResponse<U> {
        ItemResponse {
            resource: f(self.resource),
            request_charge: self.request_charge,
            status_code: self.status_code,
        }
    }
}

/// Result of a delete, which carries no resource
#[derive(Debug, Clone, Copy)]
pub struct DeleteResponse {
    /// Charge for this call
    pub request_charge: RequestCharge,

    /// HTTP status reported by the service
    pub status_code: u16,
}

/// One page of query results
#[derive(Debug, Clone)]
pub struct QueryPage<T> {
    /// Items on this page, in query order
    pub items: Vec<T>,

    /// Charge for fetching this page
    pub request_charge: RequestCharge,

    /// Opaque token for the next page, `None` on the last page
    pub continuation: Option<String>,
}

impl<T> QueryPage<T> {
    /// True if more pages follow
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_sum() {
        let charges = vec![RequestCharge::new(1.5), RequestCharge::new(2.25)];
        let total: RequestCharge = charges.into_iter().sum();
        assert_eq!(total.value(), 3.75);
    }

    #[test]
    fn test_charge_display_rounds() {
        let mut total = RequestCharge::ZERO;
        total += RequestCharge::new(0.1);
        total += RequestCharge::new(0.2);
        assert_eq!(total.to_string(), "0.3 RUs");
        assert_eq!(RequestCharge::new(10.0).to_string(), "10 RUs");
    }

    #[test]
    fn test_item_response_map() {
        let resp = ItemResponse::new(2, RequestCharge::new(1.0), 200);
        let mapped = resp.map(|v| v * 10);
        assert_eq!(mapped.resource, 20);
        assert_eq!(mapped.status_code, 200);
    }

    #[test]
    fn test_query_page_has_more() {
        let page: QueryPage<u8> = QueryPage {
            items: vec![],
            request_charge: RequestCharge::ZERO,
            continuation: Some("2".to_string()),
        };
        assert!(page.has_more());
    }
}
