//! Profile reads and updates for authenticated principals.
use std::sync::Arc;

use tracing::{info, instrument, warn};
use vidtube_common::PrincipalView;

use crate::auth::AuthError;
use crate::media::{MediaStore, MediaUpload};
use crate::storage::{CredentialStore, PrincipalId, StoreError};
use crate::validation::{validate_email, validate_full_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    fn label(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::CoverImage => "cover image",
        }
    }
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn CredentialStore>,
    media: Arc<dyn MediaStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn CredentialStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    pub async fn current_user(&self, id: &PrincipalId) -> Result<PrincipalView, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .map(|r| r.view())
            .ok_or(AuthError::NotFound)
    }

    /// Replace display name and email. A taken email is a validation error here.
    #[instrument(skip(self, full_name, email))]
    pub async fn update_account(
        &self,
        id: &PrincipalId,
        full_name: &str,
        email: &str,
    ) -> Result<PrincipalView, AuthError> {
        if full_name.trim().is_empty() || email.trim().is_empty() {
            return Err(AuthError::Validation(
                "full name and email are required".to_string(),
            ));
        }
        let full_name = validate_full_name(full_name)?;
        let email = validate_email(email)?;

        let record = self
            .store
            .update_profile(id, full_name.to_string(), email.to_string())
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => AuthError::Validation("email already in use".to_string()),
                other => other.into(),
            })?;

        info!(principal = %id, "account details updated");
        Ok(record.view())
    }

    pub async fn update_avatar(
        &self,
        id: &PrincipalId,
        upload: Option<MediaUpload>,
    ) -> Result<PrincipalView, AuthError> {
        self.replace_image(id, upload, ImageSlot::Avatar).await
    }

    pub async fn update_cover_image(
        &self,
        id: &PrincipalId,
        upload: Option<MediaUpload>,
    ) -> Result<PrincipalView, AuthError> {
        self.replace_image(id, upload, ImageSlot::CoverImage).await
    }

    /// Upload, point the principal at the new URL, then drop the old object
    #[instrument(skip(self, upload))]
    async fn replace_image(
        &self,
        id: &PrincipalId,
        upload: Option<MediaUpload>,
        slot: ImageSlot,
    ) -> Result<PrincipalView, AuthError> {
        let upload = upload
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::Validation(format!("{} file is missing", slot.label())))?;

        // Fail before uploading anything for a principal that no longer exists
        if self.store.find_by_id(id).await?.is_none() {
            return Err(AuthError::NotFound);
        }

        let object = self.media.upload(upload).await?;
        let previous = match slot {
            ImageSlot::Avatar => self.store.set_avatar_url(id, object.url).await?,
            ImageSlot::CoverImage => self.store.set_cover_image_url(id, object.url).await?,
        };

        if let Some(old_url) = previous {
            // The new URL is already stored; only the old object may linger
            self.media.delete(&old_url).await.map_err(|e| {
                warn!(principal = %id, error = %e, "failed to delete previous {}", slot.label());
                AuthError::Upstream(e.to_string())
            })?;
        }

        info!(principal = %id, public_id = %object.public_id, "{} updated", slot.label());
        self.current_user(id).await
    }
}
