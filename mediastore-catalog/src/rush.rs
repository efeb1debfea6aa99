//! Rush (expedited) delivery eligibility.
//!
//! Two independent checks feed the decision: whether the delivery address
//! lies in a rush-serviceable zone and whether each product may ship rush.
//! Both are plain predicates; neither touches storage.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use crate::delivery::DeliveryInfo;
use crate::product::Product;

pub const RUSH_UNSUPPORTED_PROMPT: &str = "Your delivery address or selected products do not support rush delivery. Please update your delivery information or product selection.";

/// Decides whether a single subject allows rush handling.
/// A missing subject is never eligible.
pub trait RushCheck<T>: Send + Sync {
    fn is_rush_allowed(&self, subject: Option<&T>) -> bool;
}

/// Address policy backed by a list of serviceable provinces.
#[derive(Debug, Clone, Default)]
pub struct ProvinceAllowList {
    provinces: HashSet<String>,
}

impl ProvinceAllowList {
    pub fn new<I, S>(provinces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            provinces: provinces
                .into_iter()
                .map(|p| normalize_province(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, province: &str) -> bool {
        self.provinces.contains(&normalize_province(province))
    }
}

fn normalize_province(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl RushCheck<DeliveryInfo> for ProvinceAllowList {
    fn is_rush_allowed(&self, subject: Option<&DeliveryInfo>) -> bool {
        subject.is_some_and(|info| self.contains(&info.province))
    }
}

/// Reads the catalog's precomputed flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRushCheck;

impl RushCheck<Product> for ProductRushCheck {
    fn is_rush_allowed(&self, subject: Option<&Product>) -> bool {
        subject.is_some_and(|product| product.rush_eligible)
    }
}

/// Outcome of evaluating a delivery against a set of products
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RushDecision {
    pub supported: bool,
    pub rush_products: Vec<Product>,
    pub regular_products: Vec<Product>,
    pub message: Option<String>,
}

pub struct RushEvaluator {
    address_policy: Arc<dyn RushCheck<DeliveryInfo>>,
    product_policy: ProductRushCheck,
}

impl RushEvaluator {
    pub fn new(address_policy: Arc<dyn RushCheck<DeliveryInfo>>) -> Self {
        Self {
            address_policy,
            product_policy: ProductRushCheck,
        }
    }

    pub fn is_address_eligible(&self, delivery: Option<&DeliveryInfo>) -> bool {
        self.address_policy.is_rush_allowed(delivery)
    }

    pub fn is_product_eligible(&self, product: Option<&Product>) -> bool {
        self.product_policy.is_rush_allowed(product)
    }

    /// Splits `products` into rush and regular lists, keeping input order
    /// within each list.
    pub fn place_rush_order(&self, delivery: Option<&DeliveryInfo>, products: &[Product]) -> RushDecision {
        let address_eligible = self.is_address_eligible(delivery);

        let (rush_products, regular_products): (Vec<Product>, Vec<Product>) = products
            .iter()
            .cloned()
            .partition(|product| self.is_product_eligible(Some(product)));

        let supported = address_eligible && !rush_products.is_empty();

        RushDecision {
            supported,
            rush_products,
            regular_products,
            message: (!supported).then(|| RUSH_UNSUPPORTED_PROMPT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductCategory;
    use rust_decimal_macros::dec;

    fn evaluator() -> RushEvaluator {
        RushEvaluator::new(Arc::new(ProvinceAllowList::new(["Ha Noi"])))
    }

    fn hanoi() -> DeliveryInfo {
        DeliveryInfo::new("Lan", "0912345678", "1 Trang Tien", "Ha Noi")
    }

    #[test]
    fn test_province_matching_ignores_case_and_spacing() {
        let policy = ProvinceAllowList::new(["Ha Noi", "  "]);
        assert!(policy.contains("  ha   NOI "));
        assert!(!policy.contains("Da Nang"));
        assert!(!policy.contains(""));
    }

    #[test]
    fn test_missing_subjects_not_eligible() {
        let evaluator = evaluator();
        assert!(!evaluator.is_address_eligible(None));
        assert!(!evaluator.is_product_eligible(None));
    }

    #[test]
    fn test_partition_preserves_order() {
        let book = Product::new(ProductCategory::Book, "Dune", dec!(100));
        let cd = Product::new(ProductCategory::Cd, "Kind of Blue", dec!(50)).with_rush(true);
        let dvd = Product::new(ProductCategory::Dvd, "Alien", dec!(80));
        let lp = Product::new(ProductCategory::Lp, "Abbey Road", dec!(120)).with_rush(true);
        let products = vec![book.clone(), cd.clone(), dvd.clone(), lp.clone()];

        let decision = evaluator().place_rush_order(Some(&hanoi()), &products);

        assert!(decision.supported);
        assert_eq!(decision.rush_products, vec![cd, lp]);
        assert_eq!(decision.regular_products, vec![book, dvd]);
        assert_eq!(decision.message, None);
    }

    #[test]
    fn test_no_eligible_products_never_supported() {
        let book = Product::new(ProductCategory::Book, "Dune", dec!(100));

        let decision = evaluator().place_rush_order(Some(&hanoi()), &[book]);

        assert!(!decision.supported);
        assert!(decision.rush_products.is_empty());
        assert_eq!(decision.message.as_deref(), Some(RUSH_UNSUPPORTED_PROMPT));
    }

    #[test]
    fn test_ineligible_address_keeps_partition() {
        let cd = Product::new(ProductCategory::Cd, "Kind of Blue", dec!(50)).with_rush(true);
        let far = DeliveryInfo::new("Minh", "0987654321", "2 Bach Dang", "Da Nang");

        let decision = evaluator().place_rush_order(Some(&far), &[cd.clone()]);

        assert!(!decision.supported);
        assert_eq!(decision.rush_products, vec![cd]);
        assert!(decision.message.is_some());
    }

    #[test]
    fn test_decision_is_deterministic() {
        let cd = Product::new(ProductCategory::Cd, "Kind of Blue", dec!(50)).with_rush(true);
        let book = Product::new(ProductCategory::Book, "Dune", dec!(100));
        let products = vec![book, cd];
        let evaluator = evaluator();

        let first = evaluator.place_rush_order(Some(&hanoi()), &products);
        let second = evaluator.place_rush_order(Some(&hanoi()), &products);
        assert_eq!(first, second);
    }
}
