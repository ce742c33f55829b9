// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Certificate bootstrap gate.
//!
//! Key and CSR generation belong to collaborator scripts; this module
//! only ensures the credential material exists before MQTT starts,
//! fetching the CA and signing the CSR when it does not. Any failure
//! here is fatal to bootstrap.

use crate::config::AgentConfig;
use crate::shell::run_script;
use anyhow::{Context, Result};
use wayru_http::HttpClient;

const GEN_CSR_SCRIPT: &str = "gen-csr.sh";
const INSTALL_RADSEC_SCRIPT: &str = "install-radsec-cert.sh";

struct CertSet<'a> {
    kind: &'a str,
    ca_file: &'a str,
    cert_file: &'a str,
    key_file: &'a str,
    csr_file: &'a str,
}

const MQTT_CERTS: CertSet<'static> = CertSet {
    kind: "mqtt",
    ca_file: "mqtt-ca.crt",
    cert_file: "mqtt.crt",
    key_file: "mqtt.key",
    csr_file: "mqtt.csr",
};

const RADSEC_CERTS: CertSet<'static> = CertSet {
    kind: "radsec",
    ca_file: "radsec-ca.crt",
    cert_file: "radsec.crt",
    key_file: "radsec.key",
    csr_file: "radsec.csr",
};

/// Ensure MQTT and RADSEC credential material exists, then install the
/// RADSEC certificate for the radius collaborator.
pub async fn ensure_certificates(http: &HttpClient, config: &AgentConfig, token: &str) -> Result<()> {
    ensure_set(http, config, token, &MQTT_CERTS).await?;
    ensure_set(http, config, token, &RADSEC_CERTS).await?;

    if !config.dev_env {
        let command = format!("{}/{INSTALL_RADSEC_SCRIPT}", config.scripts_path.display());
        run_script(&command).await.context("radsec install script failed")?;
    }
    Ok(())
}

async fn ensure_set(
    http: &HttpClient,
    config: &AgentConfig,
    token: &str,
    set: &CertSet<'_>,
) -> Result<()> {
    let data = &config.data_path;
    let have_all = [set.ca_file, set.cert_file, set.key_file]
        .iter()
        .all(|name| data.join(name).exists());
    if have_all {
        tracing::debug!(kind = set.kind, "certificate material present");
        return Ok(());
    }

    tracing::info!(kind = set.kind, "acquiring certificate material");

    // CA first
    let ca_url = format!("{}/certificate-signing/ca/{}", config.accounting_api, set.kind);
    http.download(&ca_url, Some(token), &data.join(set.ca_file))
        .await
        .with_context(|| format!("failed to obtain {} CA certificate", set.kind))?;

    // Key + CSR come from the collaborator script
    let csr_path = data.join(set.csr_file);
    let gen = format!(
        "{}/{GEN_CSR_SCRIPT} {} {}",
        config.scripts_path.display(),
        set.kind,
        data.display()
    );
    run_script(&gen).await.with_context(|| format!("failed to generate {} CSR", set.kind))?;
    if !csr_path.exists() || !data.join(set.key_file).exists() {
        anyhow::bail!("{} CSR generation produced no key material", set.kind);
    }

    // Sign it
    let sign_url = format!("{}/certificate-signing/sign/{}", config.accounting_api, set.kind);
    let response = http
        .upload_file(&sign_url, Some(token), "file", &csr_path)
        .await
        .with_context(|| format!("failed to sign {} certificate", set.kind))?;
    if !response.is_success() {
        anyhow::bail!("{} certificate signing rejected with status {}", set.kind, response.status);
    }

    std::fs::write(data.join(set.cert_file), response.body.as_bytes())
        .with_context(|| format!("failed to persist {} certificate", set.kind))?;
    tracing::info!(kind = set.kind, "certificate material installed");
    Ok(())
}
