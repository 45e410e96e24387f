//! Certificate and configuration fixtures

use o365_audit_dl::Config;
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Passphrase protecting generated certificates
pub const PFX_PASSWORD: &str = "integration-secret";

/// Tenant id used by the mock tenant
pub const TENANT_ID: &str = "7d5fd4a1-3c44-4f0c-9c2e-1b2a3c4d5e6f";

/// Application (client) id used by the mock tenant
pub const CLIENT_ID: &str = "0f9e8d7c-6b5a-4938-2716-a5b4c3d2e1f0";

/// Generate a self-signed RSA certificate bundle (PKCS#12 DER)
pub fn generate_pfx(passphrase: &str) -> Vec<u8> {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "o365-audit-dl integration")
        .unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let mut pkcs12 = Pkcs12::builder();
    pkcs12.name("o365-audit-dl").pkey(&key).cert(&cert);
    pkcs12.build2(passphrase).unwrap().to_der().unwrap()
}

/// Write a fresh certificate into a temp directory
///
/// Returns the path and the directory (keep it alive for the test duration)
pub fn write_pfx() -> (PathBuf, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.pfx");
    std::fs::write(&path, generate_pfx(PFX_PASSWORD)).unwrap();
    (path, dir)
}

/// Configuration pointing both the token endpoint and the API at `base_url`
///
/// `extra` is merged over the generated JSON, e.g. to set a run mode.
pub fn config_for(base_url: &str, pfx_path: &Path, extra: serde_json::Value) -> Config {
    let mut json = serde_json::json!({
        "client_id": CLIENT_ID,
        "tenant_id": TENANT_ID,
        "certificate": { "pfx_path": pfx_path, "pfx_password": PFX_PASSWORD },
        "content_type": "Audit.SharePoint",
        "http": {
            "api_base_url": base_url,
            "login_base_url": base_url,
            "request_timeout": 5,
            "max_concurrent_fetches": 4
        }
    });
    if let (Some(target), serde_json::Value::Object(extra)) = (json.as_object_mut(), extra) {
        target.extend(extra);
    }
    serde_json::from_value(json).unwrap()
}
