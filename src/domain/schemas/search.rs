//! Search result schema: one record per item of a result page, ranked.

use serde_json::Value;

use crate::domain::record::NormalizedRecord;
use crate::domain::schema::{
    pluck, root_domain_slug, ColumnKind as K, ColumnSpec as C, DomainSchema, DuplicateKeyRule,
    Endpoint, QaRules, RecordContext,
};
use crate::domain::task::Domain;

static COLUMNS: &[C] = &[
    C::new("statuscode", K::Status),
    C::new("error_message", K::ErrorMessage),
    C::new("search_term", K::Key),
    C::new("page", K::Page),
    C::new("rank", K::Numeric),
    C::new("title", K::Text),
    C::new("brand", K::Text),
    C::new("price", K::Numeric),
    C::new("url", K::Url),
    C::new("sku", K::Text),
    C::new("duplicate_sku", K::Derived),
    C::new("rootdomain", K::Text),
    C::new("average_customer_review", K::Numeric),
    C::new("number_of_customer_reviews", K::Numeric),
    C::new("number_of_customer_ratings", K::Numeric),
    C::new("mpn", K::Text),
    C::new("is_sponsored", K::Numeric),
    C::new("promo_text", K::Text),
    C::new("shipping_type", K::Text),
    C::new("get_it_by", K::Text),
    C::new("number_of_favorites", K::Numeric),
    C::new("list_price", K::Numeric),
    C::new("open_box_price", K::Numeric),
    C::new("bestseller_text", K::Text),
    C::new("quantity_sold", K::Numeric),
    C::new("description", K::Text),
    C::new("image_url", K::Url),
    C::new("upc", K::Text),
    C::new("seller_id", K::Text),
    C::new("timestamp", K::Timestamp),
];

/// Columns read from the search item itself
const ITEM_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("brand", "brand"),
    ("price", "price"),
    ("url", "url"),
    ("sku", "sku"),
    ("rootdomain", "rootdomain"),
    ("average_customer_review", "averageCustomerReview"),
    ("number_of_customer_reviews", "numberOfCustomerReviews"),
    ("mpn", "mpn"),
    ("is_sponsored", "isSponsored"),
    ("promo_text", "promoText"),
    ("shipping_type", "shippingType"),
    ("get_it_by", "getItBy"),
    ("number_of_favorites", "numberOfFavorites"),
    ("list_price", "listPrice"),
    ("open_box_price", "openBoxPrice"),
    ("bestseller_text", "bestsellerText"),
    ("quantity_sold", "quantitySold"),
];

/// Columns read from `sellerSku.skuEntry`
const ENTRY_FIELDS: &[(&str, &str)] = &[
    ("number_of_customer_ratings", "numberOfCustomerRatings"),
    ("description", "description"),
    ("image_url", "imageUrl"),
    ("upc", "upc"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchSchema;

impl SearchSchema {
    fn item_record(&self, ctx: &RecordContext<'_>, item: &Value, rank: u32) -> NormalizedRecord {
        let mut record = self.stamped_record(ctx);
        record.set("statuscode", 200_u16);
        record.set("rank", rank);

        for (column, field) in ITEM_FIELDS {
            record.set_json(column, pluck(item, &[*field]));
        }
        for (column, field) in ENTRY_FIELDS {
            record.set_json(column, pluck(item, &["sellerSku", "skuEntry", *field]));
        }
        record.set_json("seller_id", pluck(item, &["sellerSku", "sellerId"]));
        record
    }
}

/// Overall rank of the `index`-th (1-based) item on `page`
#[must_use]
pub const fn search_rank(page: u32, items_on_page: u32, index: u32) -> u32 {
    page.saturating_sub(1) * items_on_page + index
}

impl DomainSchema for SearchSchema {
    fn domain(&self) -> Domain {
        Domain::Search
    }

    fn sheet_title(&self) -> &'static str {
        "Search Data"
    }

    fn columns(&self) -> &'static [C] {
        COLUMNS
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            path: "/api/search",
            key_param: "term",
            paged: true,
        }
    }

    fn qa_rules(&self) -> QaRules {
        QaRules {
            duplicate_key: Some(DuplicateKeyRule {
                key_column: "sku",
                marker_column: Some("duplicate_sku"),
            }),
            ..QaRules::default()
        }
    }

    fn page_items<'a>(&self, payload: &'a Value) -> Option<&'a [Value]> {
        Some(
            pluck(payload, &["searchItems"])
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
        )
    }

    fn records_from_payload(&self, ctx: &RecordContext<'_>, payload: &Value) -> Vec<NormalizedRecord> {
        let items = self.page_items(payload).unwrap_or_default();
        let page = ctx.page.unwrap_or(1);
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);

        items
            .iter()
            .zip(1..)
            .map(|(item, index)| self.item_record(ctx, item, search_rank(page, count, index)))
            .collect()
    }

    fn default_file_name(&self, root_domain: &str) -> String {
        format!("Search_{}.xlsx", root_domain_slug(root_domain))
    }
}
