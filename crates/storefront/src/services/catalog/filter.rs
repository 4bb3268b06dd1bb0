//! Product listing filters.
//!
//! Raw query-string options are parsed into a [`ProductFilter`]: an ordered
//! list of [`Predicate`]s plus sort order and page. Parsing is pure and
//! rejects malformed input up front; slug predicates are resolved against
//! storage later (see [`super::query`]).

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use nutrishop_core::{PageRequest, PageRequestError};

/// Errors produced while parsing listing options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// A numeric option did not parse.
    #[error("Invalid {field}: '{value}' is not a valid number")]
    InvalidNumber { field: &'static str, value: String },

    /// `minPrice` is greater than `maxPrice`.
    #[error("minPrice cannot be greater than maxPrice")]
    InvertedPriceRange,

    /// Negative price bound.
    #[error("{0} cannot be negative")]
    NegativePrice(&'static str),

    /// `page` or `limit` out of range.
    #[error("Invalid pagination: {0}")]
    Page(#[from] PageRequestError),

    /// A text option contains control characters, which storage rejects.
    #[error("Invalid {0}: control characters are not allowed")]
    ControlCharacter(&'static str),

    /// `sortBy` is not one of the accepted values.
    #[error("Invalid sortBy '{0}': expected one of newest, price-low, price-high")]
    UnknownSort(String),
}

/// Raw listing options as sent on the query string.
///
/// Everything is kept as text so malformed values produce a field-specific
/// message instead of a generic deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub category_slug: Option<String>,
    pub brand_slug: Option<String>,
    pub search: Option<String>,
    pub health_goal: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub form: Option<String>,
    pub is_featured: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Reference table a slug is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    Categories,
    Brands,
}

impl LookupTable {
    /// Table holding the slug.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Brands => "brands",
        }
    }

    /// Foreign key column on `products`.
    #[must_use]
    pub const fn product_column(self) -> &'static str {
        match self {
            Self::Categories => "products.category_id",
            Self::Brands => "products.brand_id",
        }
    }
}

/// Product columns that support exact-match filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Form,
}

impl ProductField {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Form => "products.form",
        }
    }
}

/// One listing filter, before slugs are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Restrict to products referencing the row with this slug.
    SlugLookup { table: LookupTable, slug: String },
    /// Restrict to products tagged with the health goal with this slug.
    HealthGoal(String),
    /// Case-insensitive substring match on name and descriptions.
    Search(String),
    /// Inclusive price range; at least one bound is set.
    PriceRange {
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    /// Exact column match.
    ExactMatch { field: ProductField, value: String },
    /// Featured products only.
    Featured,
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
}

impl SortOrder {
    /// Parse the `sortBy` option.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UnknownSort` for anything but the three
    /// accepted values.
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        match s {
            "newest" => Ok(Self::Newest),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            other => Err(FilterError::UnknownSort(other.to_string())),
        }
    }

    /// `ORDER BY` clause. Every order ends in `id` so pages never overlap.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "products.created_at DESC, products.id DESC",
            Self::PriceLow => "products.price ASC, products.id ASC",
            Self::PriceHigh => "products.price DESC, products.id DESC",
        }
    }
}

/// A fully parsed product listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub predicates: Vec<Predicate>,
    pub sort: SortOrder,
    pub page: PageRequest,
}

impl TryFrom<ProductListParams> for ProductFilter {
    type Error = FilterError;

    fn try_from(params: ProductListParams) -> Result<Self, Self::Error> {
        let mut predicates = Vec::new();

        if let Some(slug) = present("categorySlug", params.category_slug)? {
            predicates.push(Predicate::SlugLookup {
                table: LookupTable::Categories,
                slug,
            });
        }

        if let Some(slug) = present("brandSlug", params.brand_slug)? {
            predicates.push(Predicate::SlugLookup {
                table: LookupTable::Brands,
                slug,
            });
        }

        if let Some(text) = present("search", params.search)? {
            predicates.push(Predicate::Search(text));
        }

        if let Some(slug) = present("healthGoal", params.health_goal)? {
            predicates.push(Predicate::HealthGoal(slug));
        }

        let min = parse_price("minPrice", params.min_price)?;
        let max = parse_price("maxPrice", params.max_price)?;
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(FilterError::InvertedPriceRange);
        }
        if min.is_some() || max.is_some() {
            predicates.push(Predicate::PriceRange { min, max });
        }

        if let Some(value) = present("form", params.form)? {
            predicates.push(Predicate::ExactMatch {
                field: ProductField::Form,
                value,
            });
        }

        if params.is_featured.as_deref() == Some("true") {
            predicates.push(Predicate::Featured);
        }

        let sort = present("sortBy", params.sort_by)?
            .map(|s| SortOrder::parse(&s))
            .transpose()?
            .unwrap_or_default();

        let page = parse_u32("page", params.page)?.unwrap_or(PageRequest::DEFAULT_PAGE);
        let limit = parse_u32("limit", params.limit)?.unwrap_or(PageRequest::DEFAULT_LIMIT);

        Ok(Self {
            predicates,
            sort,
            page: PageRequest::new(page, limit)?,
        })
    }
}

/// Treat missing and blank options the same.
///
/// # Errors
///
/// Returns `FilterError::ControlCharacter` if the trimmed value contains
/// control characters.
pub fn present(field: &'static str, value: Option<String>) -> Result<Option<String>, FilterError> {
    let Some(value) = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };

    if value.chars().any(char::is_control) {
        return Err(FilterError::ControlCharacter(field));
    }

    Ok(Some(value))
}

fn parse_price(field: &'static str, raw: Option<String>) -> Result<Option<Decimal>, FilterError> {
    let Some(raw) = present(field, raw)? else {
        return Ok(None);
    };

    let value: Decimal = raw
        .parse()
        .map_err(|_| FilterError::InvalidNumber { field, value: raw })?;

    if value.is_sign_negative() {
        return Err(FilterError::NegativePrice(field));
    }

    Ok(Some(value))
}

fn parse_u32(field: &'static str, raw: Option<String>) -> Result<Option<u32>, FilterError> {
    let Some(raw) = present(field, raw)? else {
        return Ok(None);
    };

    // Negative and zero values parse here and are rejected by `PageRequest`.
    match raw.parse::<i64>() {
        Ok(n) if n < 1 => Ok(Some(0)),
        Ok(n) => Ok(Some(u32::try_from(n).unwrap_or(u32::MAX))),
        Err(_) => Err(FilterError::InvalidNumber { field, value: raw }),
    }
}
