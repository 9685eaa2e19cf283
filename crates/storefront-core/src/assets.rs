//! Product asset registry: which template and gallery images belong to which
//! product or product editing session.
//!
//! Object bytes live in object storage; this registry only records the keys.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;

/// Correlation key sent with every admin upload.
///
/// New products are edited under a session id until they are saved; existing
/// products are addressed by product id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductRef {
    Session(String),
    Product(String),
}

impl ProductRef {
    /// Build from the optional form/query parameters. The session id wins when
    /// both are present; empty strings count as missing.
    pub fn from_params(
        session_id: Option<&str>,
        product_id: Option<&str>,
    ) -> Result<Self, AppError> {
        let present = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match (present(session_id), present(product_id)) {
            (Some(session), _) => Ok(ProductRef::Session(session)),
            (None, Some(product)) => Ok(ProductRef::Product(product)),
            (None, None) => Err(AppError::BadRequest(
                "Either session_id or product_id must be provided".to_string(),
            )),
        }
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductRef::Session(id) => write!(f, "session:{id}"),
            ProductRef::Product(id) => write!(f, "product:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    /// Object key, i.e. the converted filename
    pub object_key: String,
    /// Filename as uploaded
    pub original_filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: Uuid,
    pub product: ProductRef,
    pub object_key: String,
    pub image_url: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Persistence for product assets
#[async_trait]
pub trait ProductAssets: Send + Sync {
    /// Attach a template, returning the record it replaced.
    async fn set_template(
        &self,
        product: &ProductRef,
        record: TemplateRecord,
    ) -> Result<Option<TemplateRecord>, AppError>;

    async fn template(&self, product: &ProductRef) -> Result<Option<TemplateRecord>, AppError>;

    /// Whether any record exists for the product.
    async fn contains_product(&self, product: &ProductRef) -> Result<bool, AppError>;

    /// Detach the template, returning it. The product itself stays known.
    async fn take_template(&self, product: &ProductRef)
        -> Result<Option<TemplateRecord>, AppError>;

    async fn add_image(&self, image: GalleryImage) -> Result<(), AppError>;

    /// Images for the product, oldest first.
    async fn images(&self, product: &ProductRef) -> Result<Vec<GalleryImage>, AppError>;

    async fn image(&self, id: Uuid) -> Result<Option<GalleryImage>, AppError>;

    async fn take_image(&self, id: Uuid) -> Result<Option<GalleryImage>, AppError>;
}

#[derive(Debug, Default)]
struct ProductEntry {
    template: Option<TemplateRecord>,
}

#[derive(Debug, Default)]
struct Registry {
    products: HashMap<ProductRef, ProductEntry>,
    images: Vec<GalleryImage>,
}

/// Process-local registry. State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryProductAssets {
    inner: RwLock<Registry>,
}

impl InMemoryProductAssets {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductAssets for InMemoryProductAssets {
    async fn set_template(
        &self,
        product: &ProductRef,
        record: TemplateRecord,
    ) -> Result<Option<TemplateRecord>, AppError> {
        let mut registry = self.inner.write().await;
        let entry = registry.products.entry(product.clone()).or_default();
        Ok(entry.template.replace(record))
    }

    async fn template(&self, product: &ProductRef) -> Result<Option<TemplateRecord>, AppError> {
        let registry = self.inner.read().await;
        Ok(registry
            .products
            .get(product)
            .and_then(|entry| entry.template.clone()))
    }

    async fn contains_product(&self, product: &ProductRef) -> Result<bool, AppError> {
        let registry = self.inner.read().await;
        Ok(registry.products.contains_key(product)
            || registry.images.iter().any(|image| &image.product == product))
    }

    async fn take_template(
        &self,
        product: &ProductRef,
    ) -> Result<Option<TemplateRecord>, AppError> {
        let mut registry = self.inner.write().await;
        Ok(registry
            .products
            .get_mut(product)
            .and_then(|entry| entry.template.take()))
    }

    async fn add_image(&self, image: GalleryImage) -> Result<(), AppError> {
        let mut registry = self.inner.write().await;
        registry.products.entry(image.product.clone()).or_default();
        registry.images.push(image);
        Ok(())
    }

    async fn images(&self, product: &ProductRef) -> Result<Vec<GalleryImage>, AppError> {
        let registry = self.inner.read().await;
        Ok(registry
            .images
            .iter()
            .filter(|image| &image.product == product)
            .cloned()
            .collect())
    }

    async fn image(&self, id: Uuid) -> Result<Option<GalleryImage>, AppError> {
        let registry = self.inner.read().await;
        Ok(registry.images.iter().find(|image| image.id == id).cloned())
    }

    async fn take_image(&self, id: Uuid) -> Result<Option<GalleryImage>, AppError> {
        let mut registry = self.inner.write().await;
        let position = registry.images.iter().position(|image| image.id == id);
        Ok(position.map(|index| registry.images.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(key: &str) -> TemplateRecord {
        TemplateRecord {
            object_key: key.to_string(),
            original_filename: "Template.zip".to_string(),
            size_bytes: 42,
            uploaded_at: Utc::now(),
        }
    }

    fn image(product: &ProductRef, key: &str) -> GalleryImage {
        GalleryImage {
            id: Uuid::new_v4(),
            product: product.clone(),
            object_key: key.to_string(),
            image_url: format!("https://bucket.s3.us-east-1.amazonaws.com/{key}"),
            size_bytes: 7,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_ref_prefers_session() {
        assert_eq!(
            ProductRef::from_params(Some("abc"), Some("7")).unwrap(),
            ProductRef::Session("abc".to_string())
        );
        assert_eq!(
            ProductRef::from_params(Some("  "), Some("7")).unwrap(),
            ProductRef::Product("7".to_string())
        );
    }

    #[test]
    fn test_product_ref_requires_one_key() {
        let err = ProductRef::from_params(None, Some("")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Either session_id or product_id must be provided"
        );
    }

    #[tokio::test]
    async fn test_set_template_returns_replaced_record() {
        let assets = InMemoryProductAssets::new();
        let product = ProductRef::Product("7".to_string());

        assert!(assets
            .set_template(&product, template("a.zip"))
            .await
            .unwrap()
            .is_none());
        let replaced = assets
            .set_template(&product, template("b.zip"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(replaced.object_key, "a.zip");
        assert_eq!(
            assets.template(&product).await.unwrap().unwrap().object_key,
            "b.zip"
        );
    }

    #[tokio::test]
    async fn test_take_template_keeps_product_known() {
        let assets = InMemoryProductAssets::new();
        let session = ProductRef::Session("s1".to_string());
        assets.set_template(&session, template("a.zip")).await.unwrap();

        assert!(assets.take_template(&session).await.unwrap().is_some());
        assert!(assets.take_template(&session).await.unwrap().is_none());
        assert!(assets.contains_product(&session).await.unwrap());
        assert!(!assets
            .contains_product(&ProductRef::Session("other".to_string()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_images_are_scoped_to_product() {
        let assets = InMemoryProductAssets::new();
        let first = ProductRef::Product("1".to_string());
        let second = ProductRef::Product("2".to_string());
        let kept = image(&first, "gallery/a.png");
        let removed = image(&first, "gallery/b.png");

        assets.add_image(kept.clone()).await.unwrap();
        assets.add_image(removed.clone()).await.unwrap();
        assets.add_image(image(&second, "gallery/c.png")).await.unwrap();

        assert_eq!(assets.images(&first).await.unwrap().len(), 2);
        assert_eq!(
            assets.take_image(removed.id).await.unwrap(),
            Some(removed.clone())
        );
        assert_eq!(assets.take_image(removed.id).await.unwrap(), None);
        assert_eq!(assets.image(removed.id).await.unwrap(), None);
        assert_eq!(assets.image(kept.id).await.unwrap(), Some(kept.clone()));
        assert_eq!(assets.images(&first).await.unwrap(), vec![kept]);
    }
}
