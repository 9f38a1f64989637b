//! Versioned offline cache for the app's static assets.
//!
//! Plays the role a service worker's cache plays in the browser build of
//! this app: install the whole manifest eagerly (all-or-nothing), serve
//! cache-first with a live fetch fallback, and purge stale cache versions
//! on activation.

mod store;

use anyhow::Context;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Current cache version name.
pub const CACHE_NAME: &str = "palm-predictor-v1";

/// Static assets installed eagerly at cache-install time.
pub const ASSET_MANIFEST: [&str; 5] = [
    "/",
    "/index.html",
    "/style.css",
    "/app.js",
    "/manifest.json",
];

/// Install/activation lifecycle of a cache handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLifecycle {
    Uninstalled,
    Installing,
    Installed,
    Active,
}

/// A cached (or freshly fetched) asset body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Where a served asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Live,
}

/// Live retrieval of an asset, used at install time and as the fallback
/// when a URL is not cached.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> anyhow::Result<Asset>;
}

/// Handle to a named, versioned asset cache backed by sqlite.
pub struct AssetCache {
    pool: SqlitePool,
    name: String,
    lifecycle: CacheLifecycle,
}

impl AssetCache {
    /// Open the store at `db_path` under the given cache name. A cache
    /// that finished installing in an earlier run comes back `Installed`.
    pub async fn open<P: AsRef<Path>>(db_path: P, name: &str) -> anyhow::Result<Self> {
        let pool = store::open_pool(db_path.as_ref()).await?;
        store::ensure_schema(&pool).await?;

        let installed = sqlx::query("SELECT name FROM cache WHERE name = $1")
            .bind(name)
            .fetch_optional(&pool)
            .await?
            .is_some();

        Ok(Self {
            pool,
            name: name.to_string(),
            lifecycle: if installed {
                CacheLifecycle::Installed
            } else {
                CacheLifecycle::Uninstalled
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> CacheLifecycle {
        self.lifecycle
    }

    /// Fetch and store every manifest URL inside one transaction. If any
    /// single fetch fails the whole install rolls back and the cache
    /// stays uninstalled for this version.
    pub async fn install(
        &mut self,
        manifest: &[&str],
        fetcher: &dyn AssetFetcher,
    ) -> anyhow::Result<()> {
        self.lifecycle = CacheLifecycle::Installing;

        let result = self.install_all(manifest, fetcher).await;
        match result {
            Ok(()) => {
                self.lifecycle = CacheLifecycle::Installed;
                info!(cache = %self.name, assets = manifest.len(), "cache installed");
                Ok(())
            }
            Err(e) => {
                self.lifecycle = CacheLifecycle::Uninstalled;
                Err(e)
            }
        }
    }

    async fn install_all(
        &self,
        manifest: &[&str],
        fetcher: &dyn AssetFetcher,
    ) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut tx = self.pool.begin().await?;

        // Reinstalls replace the previous contents of this version.
        sqlx::query("DELETE FROM cache WHERE name = $1")
            .bind(&self.name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO cache (name, installed_at) VALUES ($1, $2)")
            .bind(&self.name)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        for url in manifest {
            let asset = fetcher
                .fetch(url)
                .with_context(|| format!("Failed to fetch {} during cache install", url))?;
            sqlx::query(
                "INSERT INTO asset (cache_name, url, content_type, body, fetched_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&self.name)
            .bind(*url)
            .bind(&asset.content_type)
            .bind(&asset.body)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Look a URL up in this cache version. Bodies come back byte-for-byte
    /// as stored.
    pub async fn lookup(&self, url: &str) -> anyhow::Result<Option<Asset>> {
        let row = sqlx::query(
            "SELECT url, content_type, body FROM asset WHERE cache_name = $1 AND url = $2",
        )
        .bind(&self.name)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Asset {
            url: row.get("url"),
            content_type: row.get("content_type"),
            body: row.get("body"),
        }))
    }

    /// Cache-first retrieval: serve the stored entry when present,
    /// otherwise perform exactly one live fetch and return its response
    /// unmodified. Misses are not re-cached; the cache only ever holds
    /// what install put there.
    pub async fn fetch(
        &self,
        url: &str,
        fetcher: &dyn AssetFetcher,
    ) -> anyhow::Result<(Asset, AssetSource)> {
        if let Some(asset) = self.lookup(url).await? {
            debug!(%url, "served from cache");
            return Ok((asset, AssetSource::Cache));
        }
        debug!(%url, "cache miss, fetching live");
        let asset = fetcher.fetch(url)?;
        Ok((asset, AssetSource::Live))
    }

    /// Activate this cache version: every other version in the store is
    /// deleted. Returns the purged cache names.
    pub async fn activate(&mut self) -> anyhow::Result<Vec<String>> {
        match self.lifecycle {
            CacheLifecycle::Installed | CacheLifecycle::Active => {}
            _ => anyhow::bail!("Cannot activate cache {:?} before it is installed", self.name),
        }

        let stale: Vec<String> = sqlx::query("SELECT name FROM cache WHERE name != $1")
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get("name"))
            .collect();

        for name in &stale {
            sqlx::query("DELETE FROM cache WHERE name = $1")
                .bind(name)
                .execute(&self.pool)
                .await?;
            info!(purged = %name, "removed stale cache version");
        }

        self.lifecycle = CacheLifecycle::Active;
        Ok(stale)
    }

    /// Remove this cache version and everything stored under it.
    pub async fn clear(&mut self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM cache WHERE name = $1")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        self.lifecycle = CacheLifecycle::Uninstalled;
        info!(cache = %self.name, "cache cleared");
        Ok(())
    }

    /// URLs currently stored under this cache version.
    pub async fn installed_urls(&self) -> anyhow::Result<Vec<String>> {
        Ok(
            sqlx::query("SELECT url FROM asset WHERE cache_name = $1 ORDER BY url ASC")
                .bind(&self.name)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| row.get("url"))
                .collect(),
        )
    }
}

/// Fetcher that resolves app URLs against a site directory on disk.
/// `/` maps to `index.html`, everything else to its relative path.
pub struct DirFetcher {
    site_dir: PathBuf,
}

impl DirFetcher {
    pub fn new<P: AsRef<Path>>(site_dir: P) -> Self {
        Self {
            site_dir: site_dir.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let relative = match url {
            "/" => "index.html",
            other => other.trim_start_matches('/'),
        };
        self.site_dir.join(relative)
    }
}

impl AssetFetcher for DirFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Asset> {
        let path = self.resolve(url);
        let body = std::fs::read(&path)
            .with_context(|| format!("Failed to read asset {:?} for {}", path, url))?;
        Ok(Asset {
            url: url.to_string(),
            content_type: content_type_for(&path).map(str::to_string),
            body,
        })
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => Some("text/html"),
        Some("css") => Some("text/css"),
        Some("js") => Some("text/javascript"),
        Some("json") => Some("application/json"),
        Some("png") => Some("image/png"),
        _ => None,
    }
}
