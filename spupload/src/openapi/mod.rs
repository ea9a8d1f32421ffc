//! OpenAPI document for the upload API.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::upload::UploadRequest;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SharePoint Upload API",
        description = "Accepts base64-encoded files and stores them in a SharePoint document library via Microsoft Graph."
    ),
    paths(api::handlers::upload::upload_file),
    components(schemas(UploadRequest)),
    tags(
        (name = "upload", description = "File upload")
    )
)]
pub struct ApiDoc;
