//! Derived catalog identifiers.

/// Prefix used for product SKUs when the category is unknown.
pub const GENERIC_SKU_PREFIX: &str = "GEN";

/// SKU prefix for a product: the first three characters of its category name,
/// upper-cased.
///
/// ```
/// use threadline_core::sku_prefix;
///
/// assert_eq!(sku_prefix(Some("Dresses")), "DRE");
/// assert_eq!(sku_prefix(None), "GEN");
/// ```
#[must_use]
pub fn sku_prefix(category_name: Option<&str>) -> String {
    match category_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(3).collect::<String>().to_uppercase(),
        _ => GENERIC_SKU_PREFIX.to_owned(),
    }
}

/// URL slug for a product name.
///
/// Lower-cases the name, collapses every run of characters outside `[a-z0-9]`
/// into a single `-`, and trims leading/trailing dashes.
///
/// ```
/// use threadline_core::seo_slug;
///
/// assert_eq!(seo_slug("  Linen Shirt (Slim Fit) "), "linen-shirt-slim-fit");
/// ```
#[must_use]
pub fn seo_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}
