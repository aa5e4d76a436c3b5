//! Seed the catalog from a YAML file.
//!
//! Records are created through the catalog service, so the same validation
//! and SKU generation apply as for the admin API. References between records
//! are by name:
//!
//! ```yaml
//! collections:
//!   - name: Summer Linen
//!     season: Summer
//!     is_featured: true
//! categories:
//!   - name: Tops
//!     sub_categories:
//!       - name: Shirts
//!     products:
//!       - name: Linen Shirt
//!         description: Breathable everyday shirt
//!         price: "49.00"
//!         sub_category: Shirts
//!         collection: Summer Linen
//!         sizes: [{ size: M, stock: 12 }]
//!         colors: [{ name: Sand, hex: "#d8c8a8", images: [/img/linen-sand.jpg] }]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use threadline_core::{CollectionId, Email, Price, Season, SubCategoryId};
use threadline_storefront::db::{PgStore, UserStore};
use threadline_storefront::models::{
    CategoryInput, CollectionInput, ColorVariant, CurrentUser, ProductInput, SizeStock,
    SubCategoryInput,
};
use threadline_storefront::services::CatalogService;

use super::connect;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    collections: Vec<SeedCollection>,
    #[serde(default)]
    categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
struct SeedCollection {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    season: Season,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    is_featured: bool,
}

#[derive(Debug, Deserialize)]
struct SeedCategory {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sort_order: i32,
    #[serde(default)]
    sub_categories: Vec<SeedSubCategory>,
    #[serde(default)]
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
struct SeedSubCategory {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    name: String,
    description: String,
    price: Price,
    #[serde(default)]
    original_price: Option<Price>,
    #[serde(default)]
    sub_category: Option<String>,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    sizes: Vec<SizeStock>,
    #[serde(default)]
    colors: Vec<ColorVariant>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    is_featured: bool,
}

/// Counts of created records.
#[derive(Debug, Default)]
struct SeedSummary {
    collections: usize,
    categories: usize,
    sub_categories: usize,
    products: usize,
}

/// Load `file_path` and create its records as the admin `admin_email`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the account is
/// missing or not an admin, or any record fails validation.
pub async fn catalog(file_path: &str, admin_email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    info!(
        collections = seed.collections.len(),
        categories = seed.categories.len(),
        "Parsed catalog"
    );

    let pool = connect().await?;
    let store = PgStore::new(pool.clone());

    let email = Email::parse(admin_email)?;
    let actor = store
        .get_password_hash(&email)
        .await?
        .map(|(user, _)| CurrentUser::from(&user))
        .ok_or_else(|| format!("No account registered for {admin_email}"))?;
    if !actor.is_admin() {
        return Err(format!("{admin_email} is not an admin; run `tl-cli admin promote` first").into());
    }

    let summary = apply(&CatalogService::new(&store), &actor, seed).await?;

    info!("Seeding complete!");
    info!("  Collections: {}", summary.collections);
    info!("  Categories: {}", summary.categories);
    info!("  Subcategories: {}", summary.sub_categories);
    info!("  Products: {}", summary.products);

    pool.close().await;
    Ok(())
}

async fn apply(
    catalog: &CatalogService<'_>,
    actor: &CurrentUser,
    seed: SeedFile,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut summary = SeedSummary::default();

    let mut collections: HashMap<String, CollectionId> = HashMap::new();
    for c in seed.collections {
        let created = catalog
            .create_collection(
                actor,
                CollectionInput {
                    name: c.name,
                    description: c.description,
                    image: None,
                    season: c.season,
                    year: c.year,
                    is_active: true,
                    is_featured: c.is_featured,
                    start_date: None,
                    end_date: None,
                },
            )
            .await?;
        collections.insert(created.name.clone(), created.id);
        summary.collections += 1;
    }

    for cat in seed.categories {
        let category = catalog
            .create_category(
                actor,
                CategoryInput {
                    name: cat.name,
                    description: cat.description,
                    image: None,
                    sort_order: cat.sort_order,
                    is_active: true,
                },
            )
            .await?;
        summary.categories += 1;

        let mut subs: HashMap<String, SubCategoryId> = HashMap::new();
        for (position, sub) in cat.sub_categories.into_iter().enumerate() {
            let created = catalog
                .create_sub_category(
                    actor,
                    SubCategoryInput {
                        name: sub.name,
                        category: category.id,
                        description: sub.description,
                        image: None,
                        sort_order: i32::try_from(position).unwrap_or(i32::MAX),
                        is_active: true,
                    },
                )
                .await?;
            subs.insert(created.name.clone(), created.id);
            summary.sub_categories += 1;
        }

        for p in cat.products {
            let sub_category = resolve(&subs, p.sub_category.as_deref(), "subcategory", &p.name)?;
            let collection = resolve(&collections, p.collection.as_deref(), "collection", &p.name)?;

            let created = catalog
                .create_product(
                    actor,
                    ProductInput {
                        name: p.name,
                        description: p.description,
                        price: p.price,
                        original_price: p.original_price,
                        category: category.id,
                        sub_category,
                        collection,
                        sizes: p.sizes,
                        colors: p.colors,
                        featured_image: None,
                        tags: p.tags,
                        is_active: true,
                        is_featured: p.is_featured,
                        meta_title: None,
                        meta_description: None,
                    },
                )
                .await?;
            info!(sku = %created.product.sku, name = %created.product.name, "Product created");
            summary.products += 1;
        }
    }

    Ok(summary)
}

/// Look up a referenced record by name.
fn resolve<T: Copy>(
    known: &HashMap<String, T>,
    name: Option<&str>,
    kind: &str,
    product: &str,
) -> Result<Option<T>, String> {
    let Some(name) = name else {
        return Ok(None);
    };
    known.get(name).copied().map(Some).ok_or_else(|| {
        warn!(product, kind, name, "Unknown reference");
        format!("Product {product} references unknown {kind} {name}")
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use threadline_core::Size;

    #[test]
    fn test_seed_file_parses_nested_catalog() {
        let yaml = r##"
collections:
  - name: Summer Linen
    season: Summer
    year: 2026
categories:
  - name: Tops
    sub_categories:
      - name: Shirts
    products:
      - name: Linen Shirt
        description: Breathable everyday shirt
        price: "49.00"
        sub_category: Shirts
        collection: Summer Linen
        sizes:
          - { size: M, stock: 12 }
        colors:
          - { name: Sand, hex: "#d8c8a8", images: [/img/linen-sand.jpg] }
"##;
        let seed: SeedFile = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(seed.collections.len(), 1);
        assert_eq!(seed.collections[0].season, Season::Summer);
        let product = &seed.categories[0].products[0];
        assert_eq!(product.sizes[0].size, Size::M);
        assert_eq!(product.sizes[0].stock, 12);
        assert_eq!(product.collection.as_deref(), Some("Summer Linen"));
    }

    #[test]
    fn test_resolve_reports_unknown_reference() {
        let known = HashMap::from([("Shirts".to_string(), 7_u8)]);

        assert_eq!(resolve(&known, None, "subcategory", "Tee").unwrap(), None);
        assert_eq!(
            resolve(&known, Some("Shirts"), "subcategory", "Tee").unwrap(),
            Some(7)
        );
        let err = resolve(&known, Some("Pants"), "subcategory", "Tee").unwrap_err();
        assert_eq!(err, "Product Tee references unknown subcategory Pants");
    }
}
