//! Concrete domain schemas

use std::sync::Arc;

use super::schema::DomainSchema;
use super::task::Domain;

pub mod product;
pub mod review;
pub mod search;

pub use product::{ProductEndpointMode, ProductSchema};
pub use review::ReviewSchema;
pub use search::SearchSchema;

/// Schema strategy for a run
#[must_use]
pub fn schema_for(domain: Domain, product_mode: ProductEndpointMode) -> Arc<dyn DomainSchema> {
    match domain {
        Domain::Product => Arc::new(ProductSchema::new(product_mode)),
        Domain::Search => Arc::new(SearchSchema),
        Domain::Review => Arc::new(ReviewSchema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_factory() {
        for domain in [Domain::Product, Domain::Search, Domain::Review] {
            let schema = schema_for(domain, ProductEndpointMode::default());
            assert_eq!(schema.domain(), domain);
            assert_eq!(schema.endpoint().paged, domain.is_paginated());
            assert!(schema.status_column().is_some());
        }
    }
}
