use chrono::Utc;

use super::{Handler, Result, ServiceError};
use crate::entities::VendorProfile;
use crate::repositories::RepositoryError;

impl Handler {
    pub async fn get_vendor_profile(&self, vendor_id: &str) -> Result<VendorProfile> {
        Ok(self.vendors.find(vendor_id).await?)
    }

    /// Creates or overwrites the store settings. `created_at` survives
    /// updates; everything else is a field-level overwrite.
    pub async fn update_vendor_profile(
        &self,
        vendor_id: &str,
        store_name: &str,
        description: &str,
        contact_email: &str,
    ) -> Result<VendorProfile> {
        if store_name.trim().is_empty() {
            return Err(ServiceError::Validation("store name is required".to_string()));
        }
        if !contact_email.contains('@') {
            return Err(ServiceError::Validation(
                "contact email is not an email address".to_string(),
            ));
        }

        let created_at = match self.vendors.find(vendor_id).await {
            Ok(existing) => existing.created_at,
            Err(RepositoryError::NotFound) => Utc::now(),
            Err(e) => return Err(e.into()),
        };

        let profile = VendorProfile {
            vendor_id: vendor_id.to_string(),
            store_name: store_name.to_string(),
            description: description.to_string(),
            contact_email: contact_email.to_string(),
            created_at,
            updated_at: Utc::now(),
        };
        self.vendors.upsert(profile.clone()).await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::in_memory_handler;

    #[tokio::test]
    async fn profile_round_trips_and_keeps_created_at() {
        let h = in_memory_handler();

        let first = h
            .update_vendor_profile("v-1", "Lamps & Co", "all lamps", "shop@lamps.example")
            .await
            .unwrap();

        let second = h
            .update_vendor_profile("v-1", "Lamps & Company", "", "shop@lamps.example")
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(
            h.get_vendor_profile("v-1").await.unwrap().store_name,
            "Lamps & Company"
        );
    }

    #[tokio::test]
    async fn bad_settings_are_rejected() {
        let h = in_memory_handler();

        assert!(matches!(
            h.update_vendor_profile("v-1", " ", "", "a@b.c").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            h.update_vendor_profile("v-1", "Shop", "", "not-an-email").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_profiles_are_not_found() {
        let h = in_memory_handler();

        assert!(matches!(
            h.get_vendor_profile("v-404").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
