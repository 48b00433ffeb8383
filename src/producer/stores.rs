//! Store profiles: where each store searches and how its result list is read

use url::Url;

use crate::producer::error::ProducerError;

/// How a search term is put into the search URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchUrl {
    /// `{base}/{path}/{term}`
    PathSegment { path: String },
    /// `{base}/{path}?{param}={term}`
    Query { path: String, param: String },
}

/// Where a field value is read from within a product container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelector {
    /// Text content of the first matching element
    Text(String),
    /// Attribute of the first matching element
    Attr { selector: String, attr: String },
}

impl FieldSelector {
    pub fn text(selector: &str) -> Self {
        FieldSelector::Text(selector.to_string())
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        FieldSelector::Attr {
            selector: selector.to_string(),
            attr: attr.to_string(),
        }
    }
}

/// Everything needed to search one store and read its results
#[derive(Debug, Clone)]
pub struct StoreProfile {
    /// Display name written into every record
    pub name: String,

    /// Scheme and host; relative product links are joined onto it
    pub base_url: String,

    pub search: SearchUrl,

    /// Selector of one product card in the result list
    pub product: String,

    /// Tried in order, first non-empty value wins
    pub name_fields: Vec<FieldSelector>,
    pub price_fields: Vec<FieldSelector>,
    pub link_fields: Vec<FieldSelector>,

    /// Use the search page URL when a product has no link
    pub link_falls_back_to_page: bool,
}

impl StoreProfile {
    pub fn bauhaus() -> Self {
        Self {
            name: "Bauhaus".to_string(),
            base_url: "https://www.bauhaus.hu".to_string(),
            search: SearchUrl::Query {
                path: "catalogsearch/result/".to_string(),
                param: "q".to_string(),
            },
            product: ".prefixbox-product-container".to_string(),
            name_fields: vec![FieldSelector::text(".prefixbox-product-name span")],
            price_fields: vec![FieldSelector::text(".prefixbox-product-price")],
            link_fields: vec![FieldSelector::attr(".prefixbox-product-name", "href")],
            link_falls_back_to_page: false,
        }
    }

    pub fn obi() -> Self {
        Self {
            name: "OBI".to_string(),
            base_url: "https://www.obi.hu".to_string(),
            search: SearchUrl::PathSegment {
                path: "search/".to_string(),
            },
            product: "ul.products-wp li.product".to_string(),
            name_fields: vec![FieldSelector::text("span.description p")],
            price_fields: vec![
                FieldSelector::attr("span.price-new", "data-csscontent"),
                FieldSelector::text("span.price-new"),
            ],
            link_fields: vec![FieldSelector::attr("a.product-wrapper", "href")],
            link_falls_back_to_page: true,
        }
    }

    pub fn praktiker() -> Self {
        Self {
            name: "Praktiker".to_string(),
            base_url: "https://www.praktiker.hu".to_string(),
            search: SearchUrl::PathSegment {
                path: "search/".to_string(),
            },
            product: ".prefixbox-product-container .prefixbox-product".to_string(),
            name_fields: vec![
                FieldSelector::text(".prefixbox-product-name"),
                FieldSelector::text(".prefixbox-product-name span"),
            ],
            price_fields: vec![
                FieldSelector::text("#price-with-currency .line-clamp-1"),
                FieldSelector::text("#price-with-currency"),
            ],
            link_fields: vec![FieldSelector::attr("a.pfbx-product-link", "href")],
            link_falls_back_to_page: true,
        }
    }

    /// The stores searched by a default run
    pub fn all() -> Vec<Self> {
        vec![Self::bauhaus(), Self::obi(), Self::praktiker()]
    }

    /// Same profile served from another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search page URL for `term`
    pub fn search_url(&self, term: &str) -> Result<Url, ProducerError> {
        let base = Url::parse(&self.base_url)?;
        match &self.search {
            SearchUrl::PathSegment { path } => {
                let mut url = base.join(path)?;
                let not_a_base = format!("{} cannot be a base URL", url);
                url.path_segments_mut()
                    .map_err(|_| ProducerError::Other(not_a_base))?
                    .pop_if_empty()
                    .push(term);
                Ok(url)
            }
            SearchUrl::Query { path, param } => {
                let mut url = base.join(path)?;
                url.query_pairs_mut().append_pair(param, term);
                Ok(url)
            }
        }
    }
}
