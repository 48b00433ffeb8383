//! Product extraction from store result pages

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::producer::error::ProducerError;
use crate::producer::stores::{FieldSelector, StoreProfile};
use crate::record::MatchRecord;

static PRICE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ft|darab|[\s\u{a0}*/]").expect("price noise pattern must compile")
});

/// Strip currency, unit and separator noise from a scraped price
pub fn clean_price(raw: &str) -> String {
    PRICE_NOISE.replace_all(raw, "").trim().to_string()
}

/// Make a scraped link absolute against the store base
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    base.join(href).ok().map(|url| url.to_string())
}

fn parse_selector(selector: &str) -> Result<Selector, ProducerError> {
    Selector::parse(selector)
        .map_err(|e| ProducerError::Selector(format!("'{}': {}", selector, e)))
}

fn read_field(
    element: &ElementRef<'_>,
    fields: &[FieldSelector],
) -> Result<Option<String>, ProducerError> {
    for field in fields {
        let value = match field {
            FieldSelector::Text(selector) => {
                let selector = parse_selector(selector)?;
                element.select(&selector).next().map(|e| {
                    e.text()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
            }
            FieldSelector::Attr { selector, attr } => {
                let selector = parse_selector(selector)?;
                element
                    .select(&selector)
                    .next()
                    .and_then(|e| e.value().attr(attr))
                    .map(|s| s.trim().to_string())
            }
        };
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Extract up to `max_products` match records from a result page.
///
/// Products without both a name and a price are skipped.
pub fn extract_matches(
    html: &str,
    page_url: &Url,
    profile: &StoreProfile,
    search_term: &str,
    max_products: usize,
) -> Result<Vec<MatchRecord>, ProducerError> {
    let document = Html::parse_document(html);
    let product_selector = parse_selector(&profile.product)?;
    let base = Url::parse(&profile.base_url)?;

    let mut records = Vec::new();
    for product in document.select(&product_selector).take(max_products) {
        let name = read_field(&product, &profile.name_fields)?;
        let price = read_field(&product, &profile.price_fields)?.map(|p| clean_price(&p));
        let link = read_field(&product, &profile.link_fields)?;

        let (Some(name), Some(price)) = (name, price.filter(|p| !p.is_empty())) else {
            warn!(
                "Incomplete product on {} page for '{}', skipped",
                profile.name, search_term
            );
            continue;
        };

        let url = match link.and_then(|href| absolutize(&base, &href)) {
            Some(url) => Some(url),
            None if profile.link_falls_back_to_page => Some(page_url.to_string()),
            None => None,
        };

        records.push(MatchRecord::new(
            profile.name.clone(),
            search_term,
            Some(name),
            Some(price),
            url,
        ));
    }

    Ok(records)
}
