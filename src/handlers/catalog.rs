use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::{Handler, Result, ServiceError};
use crate::entities::{Product, ProductKind, ProductStatus};
use crate::repositories::{ProductMutation, ProductQuery, RepositoryError};

pub struct NewProduct {
    pub vendor_id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub kind: ProductKind,
}

pub struct ProductEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

impl Handler {
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("product name is required".to_string()));
        }
        if input.price < 0 {
            return Err(ServiceError::Validation("price cannot be negative".to_string()));
        }

        let vendor_name = self.resolve_vendor_name(&input.vendor_id).await?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            vendor_id: input.vendor_id,
            vendor_name,
            name: input.name,
            description: input.description,
            price: input.price,
            kind: input.kind,
            status: ProductStatus::Active,
            rating: 0.0,
            review_count: 0,
            views: 0,
            needs_rating_resync: false,
            created_at: now,
            updated_at: now,
        };

        self.products.insert(product.clone()).await?;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        vendor_id: &str,
        product_id: Uuid,
        edit: ProductEdit,
    ) -> Result<Product> {
        let product = self.products.find(product_id).await?;
        if product.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "product belongs to another vendor".to_string(),
            ));
        }

        if let Some(price) = edit.price {
            if price < 0 {
                return Err(ServiceError::Validation("price cannot be negative".to_string()));
            }
        }
        if let Some(ref name) = edit.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("product name is required".to_string()));
            }
        }

        let mutation = ProductMutation {
            name: edit.name,
            description: edit.description,
            price: edit.price,
            status: None,
            updated_at: Some(Utc::now()),
        };

        Ok(self.products.update(product_id, mutation).await?)
    }

    /// Products are never hard-deleted; archiving hides them from the
    /// default listings.
    pub async fn archive_product(&self, vendor_id: &str, product_id: Uuid) -> Result<Product> {
        let product = self.products.find(product_id).await?;
        if product.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "product belongs to another vendor".to_string(),
            ));
        }
        if product.status == ProductStatus::Archived {
            return Err(ServiceError::Validation("product is already archived".to_string()));
        }

        let mutation = ProductMutation {
            status: Some(ProductStatus::Archived),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        Ok(self.products.update(product_id, mutation).await?)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product> {
        let product = self.products.find(product_id).await?;

        // View counting is best-effort; a failed bump never fails the read.
        if let Err(e) = self.products.increment_views(product_id).await {
            warn!(%product_id, error = %e, "failed to bump view counter");
        }

        Ok(product)
    }

    pub async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        Ok(self.products.finds(query).await?)
    }

    /// Denormalizes the store name onto products at create time. Vendors
    /// without a stored profile fall back to their raw id.
    pub(super) async fn resolve_vendor_name(&self, vendor_id: &str) -> Result<String> {
        match self.vendors.find(vendor_id).await {
            Ok(profile) => Ok(profile.store_name),
            Err(RepositoryError::NotFound) => Ok(vendor_id.to_string()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::in_memory_handler;

    fn physical(vendor: &str, name: &str) -> NewProduct {
        NewProduct {
            vendor_id: vendor.to_string(),
            name: name.to_string(),
            description: "".to_string(),
            price: 1500,
            kind: ProductKind::Physical,
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_negative_price() {
        let h = in_memory_handler();

        let res = h.create_product(physical("v-1", "  ")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let mut input = physical("v-1", "Lamp");
        input.price = -1;
        let res = h.create_product(input).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn vendor_name_comes_from_the_profile_when_present() {
        let h = in_memory_handler();

        h.update_vendor_profile("v-1", "Lamps & Co", "", "shop@lamps.example")
            .await
            .unwrap();

        let product = h.create_product(physical("v-1", "Lamp")).await.unwrap();
        assert_eq!(product.vendor_name, "Lamps & Co");

        let orphan = h.create_product(physical("v-2", "Chair")).await.unwrap();
        assert_eq!(orphan.vendor_name, "v-2");
    }

    #[tokio::test]
    async fn only_the_owner_can_edit_or_archive() {
        let h = in_memory_handler();
        let product = h.create_product(physical("v-1", "Lamp")).await.unwrap();

        let edit = ProductEdit {
            name: None,
            description: None,
            price: Some(2000),
        };
        let res = h.update_product("v-2", product.id, edit).await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        let res = h.archive_product("v-2", product.id).await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn archive_is_terminal_and_idempotence_is_rejected() {
        let h = in_memory_handler();
        let product = h.create_product(physical("v-1", "Lamp")).await.unwrap();

        let archived = h.archive_product("v-1", product.id).await.unwrap();
        assert_eq!(archived.status, ProductStatus::Archived);

        let res = h.archive_product("v-1", product.id).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn get_bumps_the_view_counter() {
        let h = in_memory_handler();
        let product = h.create_product(physical("v-1", "Lamp")).await.unwrap();

        h.get_product(product.id).await.unwrap();
        let seen = h.get_product(product.id).await.unwrap();

        // the second read observes the first bump
        assert_eq!(seen.views, 1);
    }

    #[tokio::test]
    async fn listing_filters_by_status() {
        let h = in_memory_handler();
        let keep = h.create_product(physical("v-1", "Lamp")).await.unwrap();
        let gone = h.create_product(physical("v-1", "Chair")).await.unwrap();
        h.archive_product("v-1", gone.id).await.unwrap();

        let active = h
            .list_products(ProductQuery {
                vendor_id: Some("v-1".to_string()),
                status: Some(ProductStatus::Active),
                name: None,
            })
            .await
            .unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
    }
}
