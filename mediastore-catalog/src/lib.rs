pub mod product;
pub mod delivery;
pub mod lookup;
pub mod rush;

pub use product::{Product, ProductCatalog, ProductCategory};
pub use delivery::DeliveryInfo;
pub use lookup::ChainedCatalog;
pub use rush::{ProductRushCheck, ProvinceAllowList, RushCheck, RushDecision, RushEvaluator};
