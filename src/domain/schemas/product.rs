//! Product detail schema
//!
//! One record per SKU. The API answers in two shapes depending on the endpoint:
//! the bulk API endpoint wraps sellers in a `sellerSkus` array, the extraction
//! endpoint returns a single `sellerSku` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::outcome::FetchFailure;
use crate::domain::record::{FieldValue, NormalizedRecord};
use crate::domain::schema::{
    pluck, root_domain_slug, ColumnKind as K, ColumnSpec as C, DomainSchema, Endpoint,
    ExpectedValue, Expectation, QaRules, RecordContext,
};
use crate::domain::task::Domain;

/// Number of image slots carried by a product
pub const IMAGE_SLOTS: usize = 10;

const IMAGE_COLUMNS: [&str; IMAGE_SLOTS] = [
    "productImageUrl1",
    "productImageUrl2",
    "productImageUrl3",
    "productImageUrl4",
    "productImageUrl5",
    "productImageUrl6",
    "productImageUrl7",
    "productImageUrl8",
    "productImageUrl9",
    "productImageUrl10",
];

/// Which product endpoint the run talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductEndpointMode {
    /// `/api/apiextraction`, payload root `sellerSkus[0]`
    #[default]
    Api,
    /// `/api/extraction/sku`, payload root `sellerSku`
    Extraction,
}

static COLUMNS: &[C] = &[
    C::new("status_code", K::Status),
    C::new("error", K::ErrorMessage),
    C::new("price", K::Numeric),
    C::new("condition", K::Numeric),
    C::new("source", K::Text),
    C::new("sku", K::Key),
    C::new("url", K::Url),
    C::new("name", K::Text),
    C::new("brand", K::Text),
    C::new("description", K::Text),
    C::new("features", K::Compound),
    C::new("upc", K::Text),
    C::new("ean", K::Text),
    C::new("mpn", K::Text),
    C::new("item_number", K::Text),
    C::new("store_sku", K::Text),
    C::new("store_name", K::Text),
    C::new("availability", K::Numeric),
    C::new("category", K::Text),
    C::new("attributes", K::Compound),
    C::new("star_rating_distribution", K::Compound),
    C::new("average_customer_review", K::Numeric),
    C::new("number_of_customer_reviews", K::Numeric),
    C::new("variants", K::Compound),
    C::new("parent_sku", K::Text),
    C::new("seller_name", K::Text),
    C::new("seller_id", K::Compound),
    C::new("quantity_sold", K::Numeric),
    C::new("quantity_sold_7d", K::Numeric),
    C::new("variant_attributes", K::Compound),
    C::new("number_of_favorites", K::Numeric),
    C::new("deal_type", K::Text),
    C::new("deal_text", K::Text),
    C::new("promo_text", K::Text),
    C::new("list_price", K::Numeric),
    C::new("numberOfPayments", K::Numeric),
    C::new("pricePerPayments", K::Numeric),
    C::new("totalPaymentsPrice", K::Numeric),
    C::new("productImageUrl1", K::Url),
    C::new("productImageUrl2", K::Url),
    C::new("productImageUrl3", K::Url),
    C::new("productImageUrl4", K::Url),
    C::new("productImageUrl5", K::Url),
    C::new("productImageUrl6", K::Url),
    C::new("productImageUrl7", K::Url),
    C::new("productImageUrl8", K::Url),
    C::new("productImageUrl9", K::Url),
    C::new("productImageUrl10", K::Url),
    C::new("Images_starts_with_http", K::Flag),
    C::new("product_Image_match", K::Flag),
    C::new("used_price", K::Numeric),
    C::new("model", K::Text),
    C::new("image_count", K::Numeric),
    C::new("video_count", K::Numeric),
    C::new("document_count", K::Numeric),
    C::new("isSponsored", K::Numeric),
    C::new("coupon_absolute_discount", K::Numeric),
    C::new("coupon_percent_discount", K::Numeric),
    C::new("panorama_count", K::Numeric),
    C::new("is_aplus", K::Numeric),
    C::new("aplus_premium", K::Numeric),
    C::new("aplus_comparison", K::Numeric),
    C::new("aplus_faq", K::Numeric),
    C::new("aplus_video", K::Numeric),
    C::new("flash_sale_end_time", K::Text),
    C::new("is_official_seller", K::Numeric),
    C::new("price_by_unit", K::Text),
    C::new("price_per_unit", K::Numeric),
    C::new("currency", K::Text),
    C::new("uvp", K::Numeric),
    C::new("shipping_options", K::Compound),
    C::new("process_name", K::ProcessName),
    C::new("timestamp", K::Timestamp),
    C::new("rootdomain", K::Text),
    C::new("preorder", K::Text),
    C::new("category_l1", K::Text),
    C::new("category_l2", K::Text),
    C::new("category_l3", K::Text),
    C::new("category_l4", K::Text),
    C::new("category_l5", K::Text),
    C::new("category_l6", K::Text),
    C::new("category_l7", K::Text),
    C::new("category_l8", K::Text),
    C::new("category_l9", K::Text),
    C::new("category_l10", K::Text),
    C::new("normalized_attributes", K::Text),
    C::new("title_attributes", K::Text),
    C::new("tagged_name", K::Text),
    C::new("number_of_customer_ratings", K::Numeric),
    C::new("redirected_sku", K::Text),
];

/// Columns copied verbatim from `skuEntry` (column, upstream field)
const ENTRY_FIELDS: &[(&str, &str)] = &[
    ("sku", "sku"),
    ("url", "url"),
    ("name", "name"),
    ("brand", "brand"),
    ("description", "description"),
    ("features", "features"),
    ("upc", "upc"),
    ("ean", "ean"),
    ("mpn", "mpn"),
    ("item_number", "itemNumber"),
    ("store_sku", "storeSku"),
    ("store_name", "storeName"),
    ("availability", "availability"),
    ("category", "category"),
    ("attributes", "attributes"),
    ("star_rating_distribution", "starRatingDistribution"),
    ("average_customer_review", "averageCustomerReview"),
    ("number_of_customer_reviews", "numberOfCustomerReviews"),
    ("variants", "variants"),
    ("parent_sku", "parentSku"),
    ("seller_name", "sellerName"),
    ("quantity_sold", "quantitySold"),
    ("quantity_sold_7d", "quantitySold7D"),
    ("variant_attributes", "variantAttributes"),
    ("number_of_favorites", "numberOfFavorites"),
    ("deal_type", "dealType"),
    ("deal_text", "dealText"),
    ("promo_text", "promoText"),
    ("list_price", "listPrice"),
    ("numberOfPayments", "numberOfPayments"),
    ("pricePerPayments", "pricePerPayments"),
    ("totalPaymentsPrice", "totalPaymentsPrice"),
    ("used_price", "usedPrice"),
    ("model", "model"),
    ("image_count", "imageCount"),
    ("video_count", "videoCount"),
    ("document_count", "documentCount"),
    ("isSponsored", "isSponsored"),
    ("coupon_absolute_discount", "couponAbsoluteDiscount"),
    ("coupon_percent_discount", "couponPercentDiscount"),
    ("panorama_count", "panoramaCount"),
    ("is_aplus", "isAPlus"),
    ("aplus_premium", "aplusPremium"),
    ("aplus_comparison", "aplusComparison"),
    ("aplus_faq", "aplusFaq"),
    ("aplus_video", "aplusVideo"),
    ("flash_sale_end_time", "flashSaleEndTime"),
    ("is_official_seller", "isOfficialSeller"),
    ("price_by_unit", "priceByUnit"),
    ("price_per_unit", "pricePerUnit"),
    ("currency", "currency"),
    ("uvp", "uvp"),
    ("shipping_options", "shippingOptions"),
    ("rootdomain", "rootDomain"),
    ("category_l1", "categoryLvl1"),
    ("category_l2", "categoryLvl2"),
    ("category_l3", "categoryLvl3"),
    ("category_l4", "categoryLvl4"),
    ("category_l5", "categoryLvl5"),
    ("category_l6", "categoryLvl6"),
    ("category_l7", "categoryLvl7"),
    ("category_l8", "categoryLvl8"),
    ("category_l9", "categoryLvl9"),
    ("category_l10", "categoryLvl10"),
    ("number_of_customer_ratings", "numberOfCustomerRatings"),
    ("redirected_sku", "redirectedSku"),
];

static EXPECTATIONS: &[Expectation] = &[
    Expectation::new("availability", ExpectedValue::TextIn(&["1"])),
    Expectation::new("condition", ExpectedValue::TextIn(&["1"])),
    Expectation::new("Images_starts_with_http", ExpectedValue::NotBool(false)),
    Expectation::new("product_Image_match", ExpectedValue::NotBool(true)),
];

/// Product detail schema
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductSchema {
    mode: ProductEndpointMode,
}

impl ProductSchema {
    #[must_use]
    pub const fn new(mode: ProductEndpointMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> ProductEndpointMode {
        self.mode
    }

    fn seller<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        match self.mode {
            ProductEndpointMode::Api => pluck(payload, &["sellerSkus"])
                .and_then(|sellers| sellers.get(0))
                .filter(|seller| !seller.is_null()),
            ProductEndpointMode::Extraction => pluck(payload, &["sellerSku"]),
        }
    }
}

/// Python-style truthiness used for the seller/entry price fallback
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Every populated image slot starts with an HTTP scheme
#[must_use]
pub fn images_start_with_http(images: &[Option<&Value>]) -> bool {
    images.iter().all(|image| match image {
        None => true,
        Some(Value::String(s)) if s.is_empty() => true,
        Some(Value::String(s)) => s.starts_with("http"),
        Some(other) => other.to_string().starts_with("http"),
    })
}

/// All image slots hold the same value, null included
#[must_use]
pub fn images_identical(images: &[Option<&Value>]) -> bool {
    images.windows(2).all(|pair| pair[0] == pair[1])
}

impl DomainSchema for ProductSchema {
    fn domain(&self) -> Domain {
        Domain::Product
    }

    fn sheet_title(&self) -> &'static str {
        "Extracted Data"
    }

    fn columns(&self) -> &'static [C] {
        COLUMNS
    }

    fn endpoint(&self) -> Endpoint {
        match self.mode {
            ProductEndpointMode::Api => Endpoint {
                path: "/api/apiextraction",
                key_param: "skus",
                paged: false,
            },
            ProductEndpointMode::Extraction => Endpoint {
                path: "/api/extraction/sku",
                key_param: "sku",
                paged: false,
            },
        }
    }

    fn qa_rules(&self) -> QaRules {
        QaRules {
            duplicate_key: None,
            expectations: EXPECTATIONS,
            complete_mappings: &["attributes"],
        }
    }

    fn records_from_payload(&self, ctx: &RecordContext<'_>, payload: &Value) -> Vec<NormalizedRecord> {
        let empty = Value::Object(Map::new());
        let seller = self.seller(payload).unwrap_or(&empty);
        let entry = pluck(seller, &["skuEntry"]).unwrap_or(&empty);

        let mut record = self.stamped_record(ctx);
        record.set("status_code", 200_u16);

        for (column, field) in ENTRY_FIELDS {
            record.set_json(column, pluck(entry, &[*field]));
        }

        let seller_price = pluck(seller, &["price"]);
        let price = seller_price
            .filter(|p| is_truthy(p))
            .or_else(|| pluck(entry, &["price"]));
        record.set("price", FieldValue::from(price));
        record.set_json("condition", pluck(seller, &["condition"]));
        record.set_json("source", pluck(seller, &["source"]));
        record.set_json("seller_id", pluck(seller, &["skuEntry", "buyBoxWinnerHistory"]));

        let images: Vec<Option<&Value>> = IMAGE_COLUMNS
            .iter()
            .map(|column| pluck(entry, &["skuImages", *column]))
            .collect();
        for (column, image) in IMAGE_COLUMNS.iter().zip(&images) {
            record.set_json(column, *image);
        }
        record.set("Images_starts_with_http", images_start_with_http(&images));
        record.set("product_Image_match", images_identical(&images));

        vec![record]
    }

    fn failure_message(&self, failure: &FetchFailure, attempts: u32) -> String {
        match failure {
            FetchFailure::Status { .. } => format!("Failed after {attempts} attempts"),
            FetchFailure::Transport { message, .. } => {
                format!("Failed after {attempts} attempts: {message}")
            }
        }
    }

    fn default_file_name(&self, root_domain: &str) -> String {
        format!("pdp_{}.xlsx", root_domain_slug(root_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::TransportErrorKind;
    use serde_json::json;

    fn ctx(key: &str) -> RecordContext<'_> {
        RecordContext {
            key,
            page: None,
            process_name: "cds",
            timestamp: "2024-01-01T00:00:00".to_string(),
        }
    }

    fn api_payload() -> Value {
        json!({
            "sellerSkus": [{
                "price": 0,
                "condition": 1,
                "source": "hp",
                "skuEntry": {
                    "buyBoxWinnerHistory": ["seller-9"],
                    "sku": "ABC-1",
                    "name": "Laptop 17",
                    "price": 499.99,
                    "availability": 1,
                    "attributes": {"color": "silver", "weight": null},
                    "skuImages": {
                        "productImageUrl1": "https://img/1.png",
                        "productImageUrl2": "//img/2.png",
                    },
                },
            }],
        })
    }

    #[test]
    fn test_api_payload_extraction() {
        let schema = ProductSchema::new(ProductEndpointMode::Api);
        let records = schema.records_from_payload(&ctx("abc-1"), &api_payload());
        assert_eq!(records.len(), 1);
        let record = &records[0];

        assert!(record.matches_columns(schema.columns()));
        assert_eq!(record.get("status_code"), Some(&FieldValue::Int(200)));
        assert_eq!(record.get("sku"), Some(&FieldValue::text("ABC-1")));
        assert_eq!(record.get("name"), Some(&FieldValue::text("Laptop 17")));
        // seller price 0 falls back to the entry price
        assert_eq!(record.get("price"), Some(&FieldValue::Float(499.99)));
        assert_eq!(record.get("condition"), Some(&FieldValue::Int(1)));
        assert_eq!(record.get("seller_id"), Some(&FieldValue::Compound(json!(["seller-9"]))));
        assert_eq!(record.get("process_name"), Some(&FieldValue::text("cds")));
        assert_eq!(record.get("Images_starts_with_http"), Some(&FieldValue::Bool(false)));
        assert_eq!(record.get("product_Image_match"), Some(&FieldValue::Bool(false)));
        assert_eq!(record.get("preorder"), Some(&FieldValue::text("")));
        assert_eq!(record.get("upc"), Some(&FieldValue::text("")));
        assert_eq!(record.get("list_price"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_extraction_payload_uses_seller_sku() {
        let schema = ProductSchema::new(ProductEndpointMode::Extraction);
        let payload = json!({"sellerSku": {"price": 10, "skuEntry": {"sku": "X"}}});
        let record = &schema.records_from_payload(&ctx("x"), &payload)[0];
        assert_eq!(record.get("price"), Some(&FieldValue::Int(10)));
        assert_eq!(record.get("sku"), Some(&FieldValue::text("X")));
        // no images at all: vacuously http, and all slots equal (null)
        assert_eq!(record.get("Images_starts_with_http"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("product_Image_match"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_malformed_payload_degrades_to_defaults() {
        let schema = ProductSchema::default();
        let record = &schema.records_from_payload(&ctx("k"), &json!(["not", "an", "object"]))[0];
        assert!(record.matches_columns(schema.columns()));
        assert_eq!(record.get("sku"), Some(&FieldValue::text("k")));
        assert_eq!(record.get("price"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_failure_record() {
        let schema = ProductSchema::default();
        let record = schema.failure_record(&ctx("b"), &FetchFailure::status(500, "boom"), 3);
        assert!(record.matches_columns(schema.columns()));
        assert_eq!(record.get("status_code"), Some(&FieldValue::Int(500)));
        assert_eq!(record.get("error"), Some(&FieldValue::text("Failed after 3 attempts")));
        assert_eq!(record.get("sku"), Some(&FieldValue::text("b")));

        let transport = FetchFailure::transport(TransportErrorKind::Connect, "refused");
        let record = schema.failure_record(&ctx("b"), &transport, 3);
        assert_eq!(record.get("status_code"), Some(&FieldValue::text("Request Failed")));
    }

    #[test]
    fn test_image_helpers() {
        let a = json!("https://x/1.png");
        let b = json!("ftp://x/1.png");
        assert!(images_start_with_http(&[Some(&a), None]));
        assert!(!images_start_with_http(&[Some(&a), Some(&b)]));
        assert!(images_identical(&[Some(&a), Some(&a)]));
        assert!(images_identical(&[None, None]));
        assert!(!images_identical(&[Some(&a), None]));
    }

    #[test]
    fn test_endpoint_modes() {
        assert_eq!(ProductSchema::new(ProductEndpointMode::Api).endpoint().key_param, "skus");
        assert_eq!(
            ProductSchema::new(ProductEndpointMode::Extraction).endpoint().path,
            "/api/extraction/sku"
        );
        assert_eq!(ProductSchema::default().default_file_name("hp.com/us"), "pdp_hp-com-us.xlsx");
    }
}
