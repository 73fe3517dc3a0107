use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_postgres::config::SslMode;
use tokio_postgres::{Client, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, warn};

use crate::error::DataAccessError;

/// Connection settings for the client/server backend.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub url: String,
    pub pool_size: u32,
    pub connect_timeout: Duration,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 8,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Accepts any server certificate. Managed hosts often present certificates that do not
/// chain to a public root; the channel is still encrypted.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TLS connector used whenever the connection string does not say `sslmode=disable`.
///
/// # Errors
/// Returns `DataAccessError::Tls` if the protocol versions cannot be configured.
pub fn tls_connector() -> Result<MakeRustlsConnect, DataAccessError> {
    let provider = Arc::new(ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
        .with_no_client_auth();
    Ok(MakeRustlsConnect::new(config))
}

#[must_use]
pub fn wants_tls(config: &tokio_postgres::Config) -> bool {
    !matches!(config.get_ssl_mode(), SslMode::Disable)
}

/// bb8 manager for Postgres clients.
pub struct PgManager {
    config: tokio_postgres::Config,
    tls: Option<MakeRustlsConnect>,
}

impl PgManager {
    /// Plain-text manager.
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config, tls: None }
    }

    /// Manager that negotiates TLS according to the config's `sslmode`.
    #[must_use]
    pub fn with_tls(config: tokio_postgres::Config, tls: MakeRustlsConnect) -> Self {
        Self {
            config,
            tls: Some(tls),
        }
    }

    /// Build a pool from this manager.
    ///
    /// No connection is opened here; the first checkout (the liveness probe) does that.
    /// Failed connects are not retried, so the driver error reaches the caller.
    ///
    /// # Errors
    /// Returns `DataAccessError::Postgres` if the pool cannot be built.
    pub async fn build_pool(
        self,
        max_size: u32,
        connect_timeout: Duration,
    ) -> Result<Pool<PgManager>, DataAccessError> {
        Pool::builder()
            .max_size(max_size.max(1))
            .connection_timeout(connect_timeout)
            .retry_connection(false)
            .build(self)
            .await
            .map_err(DataAccessError::Postgres)
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        let tls = self.tls.clone();
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                tls = tls.is_some(),
                "postgres connect start"
            );
            let client = match tls {
                Some(tls) => {
                    let (client, connection) = cfg.connect(tls).await?;
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            warn!(error = %e, "postgres connection task ended with error");
                        }
                    });
                    client
                }
                None => {
                    let (client, connection) = cfg.connect(NoTls).await?;
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            warn!(error = %e, "postgres connection task ended with error");
                        }
                    });
                    client
                }
            };
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// Parse a connection string and build the bb8 pool for it.
///
/// # Errors
/// Returns `DataAccessError::Postgres` for a malformed URL or a pool build failure, and
/// `DataAccessError::Tls` if the TLS client cannot be configured.
pub async fn build_pool(opts: &PostgresOptions) -> Result<Pool<PgManager>, DataAccessError> {
    let mut config = tokio_postgres::Config::from_str(&opts.url)?;
    config.connect_timeout(opts.connect_timeout);
    let manager = if wants_tls(&config) {
        PgManager::with_tls(config, tls_connector()?)
    } else {
        PgManager::new(config)
    };
    manager
        .build_pool(opts.pool_size, opts.connect_timeout)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_follows_sslmode() -> Result<(), tokio_postgres::Error> {
        let parse = tokio_postgres::Config::from_str;
        assert!(wants_tls(&parse("postgres://u:p@db.example/school?sslmode=require")?));
        assert!(wants_tls(&parse("postgres://u:p@db.example/school?sslmode=prefer")?));
        // libpq default is prefer
        assert!(wants_tls(&parse("postgres://u:p@db.example/school")?));
        assert!(!wants_tls(&parse("postgres://u:p@db.example/school?sslmode=disable")?));
        Ok(())
    }

    #[test]
    fn connector_builds() {
        assert!(tls_connector().is_ok());
    }
}
