use crate::config::CredentialSource;
use crate::error::AuditError;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use std::io;
use tokio::fs;

/// Service account key JSON, from a file or a base64 encoded setting.
pub async fn load_service_account_json(source: &CredentialSource) -> Result<String, AuditError> {
    match source {
        CredentialSource::File(path) => fs::read_to_string(path)
            .await
            .map_err(AuditError::Credentials),
        CredentialSource::Base64(encoded) => decode_service_account_json(encoded),
    }
}

fn decode_service_account_json(encoded: &str) -> Result<String, AuditError> {
    let bytes = URL_SAFE.decode(encoded.trim().as_bytes())?;
    String::from_utf8(bytes)
        .map_err(|err| AuditError::Credentials(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Builds a hub from a generated Google API crate. Each crate re-exports its own hyper,
/// hyper-rustls and yup-oauth2, so the client and authenticator are built from that
/// crate's paths rather than shared.
macro_rules! service_account_hub {
    ($api:ident :: $hub:ident, $key_json:expr) => {{
        use $api::{hyper, hyper_rustls, oauth2};

        let key =
            oauth2::parse_service_account_key($key_json).map_err(AuditError::Credentials)?;
        let auth = oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(AuditError::Credentials)?;

        let client = hyper::Client::builder().build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .https_or_http()
                .enable_http1()
                .build(),
        );
        Ok($api::$hub::new(client, auth))
    }};
}

pub async fn drive_hub(key_json: &str) -> Result<crate::drive::Hub, AuditError> {
    service_account_hub!(google_drive3::DriveHub, key_json)
}

pub async fn sheets_hub(key_json: &str) -> Result<crate::sheets::Hub, AuditError> {
    service_account_hub!(google_sheets4::Sheets, key_json)
}
