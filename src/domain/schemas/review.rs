//! Review schema: one record per review item of a page.

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
    C::new("sku", K::Key),
    C::new("page", K::Page),
    C::new("variantSku", K::Text),
    C::new("reviewId", K::Text),
    C::new("author", K::Text),
    C::new("rating", K::Numeric),
    C::new("date", K::Text),
    C::new("purchasedDate", K::Text),
    C::new("location", K::Text),
    C::new("attributes", K::Compound),
    C::new("title", K::Text),
    C::new("text", K::Text),
    C::new("productName", K::Text),
    C::new("recommendedReview", K::Numeric),
    C::new("productHasBeenTried", K::Numeric),
    C::new("brandResponse", K::Text),
    C::new("syndicated", K::Numeric),
    C::new("program", K::Text),
    C::new("link", K::Url),
    C::new("reviewImagesUrl", K::Url),
    C::new("sellerId", K::Text),
    C::new("timestamp", K::Timestamp),
];

/// Review columns share their upstream field names
const REVIEW_FIELDS: &[&str] = &[
    "variantSku",
    "reviewId",
    "author",
    "rating",
    "date",
    "purchasedDate",
    "location",
    "attributes",
    "title",
    "text",
    "productName",
    "recommendedReview",
    "productHasBeenTried",
    "brandResponse",
    "syndicated",
    "program",
    "link",
    "reviewImagesUrl",
    "sellerId",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewSchema;

impl DomainSchema for ReviewSchema {
    fn domain(&self) -> Domain {
        Domain::Review
    }

    fn sheet_title(&self) -> &'static str {
        "Reviews Data"
    }

    fn columns(&self) -> &'static [C] {
        COLUMNS
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            path: "/api/review",
            key_param: "sku",
            paged: true,
        }
    }

    fn qa_rules(&self) -> QaRules {
        QaRules {
            duplicate_key: Some(DuplicateKeyRule {
                key_column: "reviewId",
                marker_column: None,
            }),
            ..QaRules::default()
        }
    }

    fn page_items<'a>(&self, payload: &'a Value) -> Option<&'a [Value]> {
        Some(
            pluck(payload, &["reviewItems"])
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
        )
    }

    fn records_from_payload(&self, ctx: &RecordContext<'_>, payload: &Value) -> Vec<NormalizedRecord> {
        self.page_items(payload)
            .unwrap_or_default()
            .iter()
            .map(|review| {
                let mut record = self.stamped_record(ctx);
                record.set("statuscode", 200_u16);
                for field in REVIEW_FIELDS {
                    record.set_json(field, pluck(review, &[*field]));
                }
                record
            })
            .collect()
    }

    fn default_file_name(&self, root_domain: &str) -> String {
        format!("Reviews_for_{}.xlsx", root_domain_slug(root_domain))
    }
}
