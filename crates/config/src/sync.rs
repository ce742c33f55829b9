// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-sync core.
//!
//! Each cycle pulls the remote document, fingerprints its sections,
//! applies changes through the renderer, restarts affected services in
//! order, and persists the result as the new rollback baseline. Failure
//! rolls back in two tiers: a failed render re-applies the whole
//! last-good document; failed restarts re-apply only their sections.

use crate::fingerprint::{affected_sections, AffectedSection, HashStore, Section};
use crate::renderer::ConfigRenderer;
use crate::rollback::{wrap_section, RollbackStore};
use crate::services::{restart_services, ServiceControl};
use serde_json::Value;
use wayru_http::HttpClient;
use wayru_ipc::{IpcClient, TokenManager};

/// Per-service outcome of one cycle. Rolled-back services carry the
/// `_rollback` suffix in their reported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResult {
    pub name: String,
    pub ok: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Renderer untouched, nothing restarted.
    pub unchanged: bool,
    pub results: Vec<ServiceResult>,
}

pub struct SyncCore<R: ConfigRenderer, S: ServiceControl> {
    pub hashes: HashStore,
    pub rollback: RollbackStore,
    pub renderer: R,
    pub services: S,
}

impl<R: ConfigRenderer, S: ServiceControl> SyncCore<R, S> {
    /// Apply one remote document. See the module docs for the tiers.
    pub async fn apply_document(&self, doc: &Value) -> CycleReport {
        eprintln!("DEBUG: apply_document start");
        let affected = affected_sections(doc, &self.hashes);
        if affected.is_empty() {
            tracing::info!("no configuration changes detected");
            return CycleReport { unchanged: true, results: Vec::new() };
        }

        let names: Vec<&str> = affected.iter().map(|a| a.section.name()).collect();
        tracing::info!(sections = ?names, "configuration changes detected, applying");

        eprintln!("DEBUG: before renderer.apply");
        if let Err(e) = self.renderer.apply(doc).await {
            eprintln!("DEBUG: renderer.apply failed");
            tracing::error!(error = %e, "renderer failed, rolling back full config");
            return self.script_rollback(&affected).await;
        }

        // Persist the new fingerprints before restarting
        for item in &affected {
            if let Err(e) = self.hashes.save(item.section, &item.new_hash) {
                tracing::error!(section = item.section.name(), error = %e, "hash persist failed");
            }
        }

        let sections: Vec<Section> = affected.iter().map(|a| a.section).collect();
        eprintln!("DEBUG: before restart_services");
        let report = restart_services(&self.services, &sections).await;
        eprintln!("DEBUG: after restart_services");

        if report.all_ok() {
            // The document becomes the new rollback baseline
            if let Err(e) = self.rollback.save_full(doc) {
                tracing::error!(error = %e, "failed to persist rollback config");
            }
            for item in &affected {
                if let Err(e) = self.rollback.save_section(item.section, &item.value) {
                    tracing::error!(
                        section = item.section.name(),
                        error = %e,
                        "failed to persist rollback section"
                    );
                }
            }
            return CycleReport {
                unchanged: false,
                results: sections
                    .iter()
                    .map(|s| ServiceResult { name: s.name().to_string(), ok: true })
                    .collect(),
            };
        }

        eprintln!("DEBUG: before service_rollback");
        self.service_rollback(&affected, report.succeeded, report.failed).await
    }

    /// Script tier: the renderer itself failed. Re-apply the last-good
    /// full config without restarts, restart every affected service, and
    /// reset all fingerprints so the next cycle re-reads them from disk.
    async fn script_rollback(&self, affected: &[AffectedSection]) -> CycleReport {
        if let Some(last_good) = self.rollback.load_full() {
            if let Err(e) = self.renderer.apply(&last_good).await {
                tracing::error!(error = %e, "rollback render failed; device keeps running config");
            }
        } else {
            tracing::warn!("no rollback config available, skipping re-render");
        }

        let sections: Vec<Section> = affected.iter().map(|a| a.section).collect();
        let report = restart_services(&self.services, &sections).await;
        self.hashes.reset_all();

        CycleReport {
            unchanged: false,
            results: sections
                .iter()
                .map(|s| ServiceResult {
                    name: format!("{}_rollback", s.name()),
                    ok: report.succeeded.contains(s),
                })
                .collect(),
        }
    }

    /// Service tier: the render took, but some services failed to
    /// restart. Re-apply only their last-good sections, restart just
    /// those services, and reset just their fingerprints.
    async fn service_rollback_dbg_marker_unused() {}
    async fn service_rollback(
        &self,
        affected: &[AffectedSection],
        succeeded: Vec<Section>,
        failed: Vec<Section>,
    ) -> CycleReport {
        for section in &failed {
            match self.rollback.load_section(*section) {
                Some(last_good) => {
                    let wrapped = wrap_section(*section, &last_good);
                    if let Err(e) = self.renderer.apply(&wrapped).await {
                        tracing::error!(
                            section = section.name(),
                            error = %e,
                            "section rollback render failed"
                        );
                    }
                }
                None => tracing::warn!(
                    section = section.name(),
                    "no rollback section available, skipping re-render"
                ),
            }
        }

        let rollback_report = restart_services(&self.services, &failed).await;
        for section in &failed {
            self.hashes.reset(*section);
        }

        // Services that did restart keep their new sections as baseline
        for item in affected {
            if succeeded.contains(&item.section) {
                if let Err(e) = self.rollback.save_section(item.section, &item.value) {
                    tracing::error!(
                        section = item.section.name(),
                        error = %e,
                        "failed to persist rollback section"
                    );
                }
            }
        }

        let mut results: Vec<ServiceResult> = succeeded
            .iter()
            .map(|s| ServiceResult { name: s.name().to_string(), ok: true })
            .collect();
        results.extend(failed.iter().map(|s| ServiceResult {
            name: format!("{}_rollback", s.name()),
            ok: rollback_report.succeeded.contains(s),
        }));
        CycleReport { unchanged: false, results }
    }
}

/// Remote pull wrapped around the core: token gate, fetch, apply.
pub struct SyncService<R: ConfigRenderer, S: ServiceControl> {
    pub core: SyncCore<R, S>,
    pub http: HttpClient,
    pub endpoint: String,
    pub tokens: TokenManager<IpcClient>,
}

impl<R: ConfigRenderer, S: ServiceControl> SyncService<R, S> {
    /// One poll cycle. Skips quietly when the gate is closed or the
    /// fetch fails; the next cycle retries.
    pub async fn run_cycle(&mut self) -> Option<CycleReport> {
        if !self.tokens.is_token_valid() {
            tracing::info!("access token expired, attempting refresh");
            if let Err(e) = self.tokens.refresh_access_token().await {
                tracing::warn!(error = %e, "failed to refresh token, skipping this cycle");
                return None;
            }
        }
        if !self.tokens.should_accept_requests() {
            tracing::debug!("request acceptance disabled, skipping config sync");
            return None;
        }
        let token = self.tokens.current_token()?.to_string();

        let response = match self.http.get(&self.endpoint, Some(&token)).await {
            Ok(response) if response.is_success() => {
                self.tokens.report_http_success();
                response
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "config request failed");
                self.tokens.report_http_failure(Some(response.status));
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "config fetch failed");
                self.tokens.report_http_failure(None);
                return None;
            }
        };

        let doc: Value = match serde_json::from_str(&response.body) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(error = %e, "config payload is not valid JSON");
                return None;
            }
        };

        Some(self.core.apply_document(&doc).await)
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
