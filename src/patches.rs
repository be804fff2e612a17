// Cache patches.
// One-time migrations of persisted cache and settings state, applied in table order.

use std::collections::BTreeSet;

use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::Result;
use crate::settings::{APPLIED_PATCHES_KEY, PATCH_COUNTER_KEY, SettingsStore};

/// State a patch may migrate.
pub struct PatchContext<'a> {
    pub settings: &'a dyn SettingsStore,
    pub storage: &'a dyn CacheStorage,
    pub config: &'a Config,
}

/// Body of a patch.
pub type PatchFn = for<'a> fn(&'a PatchContext<'a>) -> BoxFuture<'a, Result<()>>;

/// A named migration step.
#[derive(Clone, Copy)]
pub struct Patch {
    /// Stable id persisted once the patch has run.
    pub id: &'static str,
    pub apply: PatchFn,
}

impl std::fmt::Debug for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patch").field("id", &self.id).finish()
    }
}

/// What a run of the patch runner did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Patches that ran, in order, including failed ones.
    pub applied: Vec<&'static str>,
    /// Patches that returned an error, with the error message.
    pub failed: Vec<(&'static str, String)>,
}

/// Applies an ordered table of patches exactly once each.
#[derive(Debug, Clone)]
pub struct PatchRunner {
    patches: Vec<Patch>,
}

impl PatchRunner {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    /// Runner over the built-in patches.
    pub fn builtin() -> Self {
        Self::new(builtin_patches())
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Run every patch not yet recorded as applied.
    ///
    /// A patch is recorded as soon as it has run, whether or not it
    /// succeeded, so a failing patch is never retried. Errors here come only
    /// from reading or persisting the applied set.
    pub async fn run(&self, ctx: &PatchContext<'_>) -> Result<PatchReport> {
        let mut applied = self.load_applied(ctx.settings).await?;
        let mut report = PatchReport::default();

        for (index, patch) in self.patches.iter().enumerate() {
            if applied.contains(patch.id) {
                continue;
            }

            info!(patch = patch.id, "applying cache patch");
            if let Err(err) = (patch.apply)(ctx).await {
                warn!(patch = patch.id, error = %err, "cache patch failed, skipping");
                report.failed.push((patch.id, err.to_string()));
            }

            applied.insert(patch.id.to_string());
            report.applied.push(patch.id);
            self.save_applied(ctx.settings, &applied, index + 1).await?;
        }

        Ok(report)
    }

    async fn load_applied(&self, settings: &dyn SettingsStore) -> Result<BTreeSet<String>> {
        if let Some(json) = settings.get(APPLIED_PATCHES_KEY).await? {
            return Ok(serde_json::from_str(&json)?);
        }

        // Only a counter was persisted: the first N patches of the table ran
        let counter = settings
            .get(PATCH_COUNTER_KEY)
            .await?
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if counter > 0 {
            debug!(counter, "migrating legacy patch counter");
        }

        Ok(self
            .patches
            .iter()
            .take(counter)
            .map(|patch| patch.id.to_string())
            .collect())
    }

    async fn save_applied(
        &self,
        settings: &dyn SettingsStore,
        applied: &BTreeSet<String>,
        position: usize,
    ) -> Result<()> {
        settings
            .set(APPLIED_PATCHES_KEY, &serde_json::to_string(applied)?)
            .await?;

        // Keep the counter monotonic for readers that only know about it
        let counter = settings
            .get(PATCH_COUNTER_KEY)
            .await?
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if position > counter {
            settings
                .set(PATCH_COUNTER_KEY, &position.to_string())
                .await?;
        }
        Ok(())
    }
}

/// The built-in patch table. Append only; never reorder or reuse ids.
pub fn builtin_patches() -> Vec<Patch> {
    vec![
        Patch {
            id: "drop-legacy-caches",
            apply: drop_legacy_caches,
        },
        Patch {
            id: "drop-1.18.2-summary",
            apply: drop_old_summary,
        },
    ]
}

fn drop_legacy_caches<'a>(ctx: &'a PatchContext<'a>) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for version in ["1.15", "1.16", "1.17"] {
            ctx.settings.remove(&format!("cache_{}", version)).await?;
        }
        for name in ["mcdata_master", "vanilla_datapack_summary"] {
            ctx.settings.remove(&format!("cached_{}", name)).await?;
        }
        ctx.storage.delete_cache("misode-v1").await?;
        Ok(())
    })
}

fn drop_old_summary<'a>(ctx: &'a PatchContext<'a>) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let prefix = format!("{}/1.18.2-summary/", ctx.config.sources.mcmeta_url);
        let cache = ctx.storage.open(&ctx.config.cache_name).await?;
        let removed = cache
            .delete_matching(&|url: &str| url.starts_with(&prefix))
            .await?;
        debug!(removed, "removed 1.18.2 summary entries");
        Ok(())
    })
}
