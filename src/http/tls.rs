//! TLS termination via rustls.

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load the PEM certificate chain and private key named in `config`.
pub async fn load_rustls_config(config: &TlsConfig) -> std::io::Result<RustlsConfig> {
    let rustls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await?;
    tracing::info!(cert = %config.cert_path, "TLS certificate loaded");
    Ok(rustls)
}
