//! Catalog tools against the admin service.

use thiserror::Error;

/// Errors from catalog commands.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("admin service returned {0}")]
    Status(u16),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Download the product catalog CSV to a local file.
///
/// # Errors
///
/// Returns a [`CatalogError`] if the request fails, the admin service
/// responds with a non-success status, or the file cannot be written.
pub async fn export(base_url: &str, output: &str) -> Result<(), CatalogError> {
    let url = format!("{}/products/export.csv", base_url.trim_end_matches('/'));

    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let rows = body.lines().count().saturating_sub(1);

    tokio::fs::write(output, &body)
        .await
        .map_err(|source| CatalogError::Write {
            path: output.to_string(),
            source,
        })?;

    tracing::info!(rows, output, "Catalog exported");
    Ok(())
}
