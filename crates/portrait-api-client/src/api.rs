//! Profile endpoints.

use async_trait::async_trait;
use portrait_core::models::{
    ConfigResponse, DeleteImageResponse, ImageUploadResponse, UpdateProfileRequest,
    UserWithProfile,
};
use portrait_processing::ProcessedImage;
use reqwest::multipart::{Form, Part};

use crate::{ApiClient, ClientError};

const IMAGES_UPLOAD_PATH: &str = "/api/images/upload";
const USERS_PATH: &str = "/api/users";
const CONFIG_PATH: &str = "/api/config";

/// Calls the save sequence needs. Implemented by [`ApiClient`].
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Upload a cropped image and return its public URL.
    async fn upload_image(&self, image: &ProcessedImage) -> Result<String, ClientError>;

    /// Delete a previously uploaded image by URL.
    async fn delete_image(&self, url: &str) -> Result<(), ClientError>;

    async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserWithProfile, ClientError>;

    async fn get_user(&self) -> Result<UserWithProfile, ClientError>;

    async fn get_config(&self) -> Result<ConfigResponse, ClientError>;
}

#[async_trait]
impl ProfileApi for ApiClient {
    #[tracing::instrument(skip(self, image), fields(size_bytes = image.bytes.len()))]
    async fn upload_image(&self, image: &ProcessedImage) -> Result<String, ClientError> {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(image.content_type)?;
        let form = Form::new().part("file", part);

        let request = self
            .http()
            .post(self.build_url(IMAGES_UPLOAD_PATH))
            .multipart(form);
        let response: ImageUploadResponse = self.send(request).await?;

        Ok(response.url)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_image(&self, url: &str) -> Result<(), ClientError> {
        let request = self
            .http()
            .delete(self.build_url(IMAGES_UPLOAD_PATH))
            .query(&[("url", url)]);
        let response: DeleteImageResponse = self.send(request).await?;

        if !response.success {
            return Err(ClientError::Decode(
                "Delete response did not report success".to_string(),
            ));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, request))]
    async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserWithProfile, ClientError> {
        let builder = self.http().patch(self.build_url(USERS_PATH)).json(request);
        self.send(builder).await
    }

    async fn get_user(&self) -> Result<UserWithProfile, ClientError> {
        self.send(self.http().get(self.build_url(USERS_PATH))).await
    }

    async fn get_config(&self) -> Result<ConfigResponse, ClientError> {
        self.send(self.http().get(self.build_url(CONFIG_PATH))).await
    }
}
