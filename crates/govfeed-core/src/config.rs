use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{DomainCategory, SourceKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// One configured feed endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// Display name (defaults to the URL host)
    #[serde(default)]
    pub name: Option<String>,
    /// Category applied to every item of this source, ahead of the domain table
    #[serde(default)]
    pub category: Option<String>,
}

impl SourceConfig {
    fn rss(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: SourceKind::Rss,
            name: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Feed endpoints, in catalog order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    /// Ordered domain -> category table; first match wins
    #[serde(default = "default_domain_categories")]
    pub domain_categories: Vec<DomainCategory>,
    /// Optional OPML file whose feeds are appended to `sources`
    #[serde(default)]
    pub opml_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            domain_categories: default_domain_categories(),
            opml_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for a cached source, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Fall back to a stale cache entry when its refetch fails; off by default
    #[serde(default)]
    pub serve_stale_on_error: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            serve_stale_on_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum concurrent outbound fetches, shared by all searches
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Hard deadline for one source fetch, in seconds
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// Largest accepted feed body
    #[serde(default = "default_max_feed_bytes")]
    pub max_feed_bytes: usize,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            request_timeout_secs: default_request_timeout(),
            task_timeout_secs: default_task_timeout(),
            max_feed_bytes: default_max_feed_bytes(),
            proxy_url: None,
        }
    }
}

/// Heuristic ranking constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_base_score")]
    pub base: i64,
    #[serde(default = "default_phrase_bonus")]
    pub phrase_bonus: i64,
    /// Points per 1000 title characters
    #[serde(default = "default_length_bonus")]
    pub length_bonus_per_1000: i64,
    #[serde(default = "default_recent_bonus")]
    pub recent_bonus: i64,
    #[serde(default = "default_recent_hours")]
    pub recent_hours: i64,
    #[serde(default = "default_week_bonus")]
    pub week_bonus: i64,
    #[serde(default = "default_week_hours")]
    pub week_hours: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: default_base_score(),
            phrase_bonus: default_phrase_bonus(),
            length_bonus_per_1000: default_length_bonus(),
            recent_bonus: default_recent_bonus(),
            recent_hours: default_recent_hours(),
            week_bonus: default_week_bonus(),
            week_hours: default_week_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Broaden deep searches with related terms
    #[serde(default)]
    pub enabled: bool,
    /// Expansion provider: "datamuse" or "openai"
    #[serde(default = "default_expansion_provider")]
    pub provider: String,
    #[serde(default = "default_datamuse_base_url")]
    pub datamuse_base_url: String,
    /// OpenAI API key (for openai provider)
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Related terms kept per query term
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_expansion_provider(),
            datamuse_base_url: default_datamuse_base_url(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            max_terms: default_max_terms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record seen articles in the local database
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database file name inside the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            database_file: default_database_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("govfeed")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_workers() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    15
}

fn default_task_timeout() -> u64 {
    20
}

fn default_max_feed_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_base_score() -> i64 {
    5
}

fn default_phrase_bonus() -> i64 {
    40
}

fn default_length_bonus() -> i64 {
    10
}

fn default_recent_bonus() -> i64 {
    5
}

fn default_recent_hours() -> i64 {
    24
}

fn default_week_bonus() -> i64 {
    2
}

fn default_week_hours() -> i64 {
    72
}

fn default_expansion_provider() -> String {
    "datamuse".to_string()
}

fn default_datamuse_base_url() -> String {
    "https://api.datamuse.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_terms() -> usize {
    5
}

fn default_database_file() -> String {
    "govfeed.db".to_string()
}

fn default_domain_categories() -> Vec<DomainCategory> {
    [
        ("defenseone", "News"),
        ("breakingdefense", "News"),
        ("army.mil", "News"),
        ("af.mil", "News"),
        ("popularmechanics", "News"),
        ("rand.org", "Think Tank"),
        ("mitre", "Think Tank"),
        ("natowatch", "Think Tank"),
        ("gov.uk", "International"),
    ]
    .into_iter()
    .map(|(domain, category)| DomainCategory::new(domain, category))
    .collect()
}

fn default_sources() -> Vec<SourceConfig> {
    let mut sources: Vec<SourceConfig> = [
        // Defense news and military
        "https://www.defenseone.com/rss/all/",
        "https://breakingdefense.com/feed/",
        "https://www.defensenews.com/arc/outboundfeeds/rss/?outputType=xml",
        "https://www.realcleardefense.com/index.xml",
        "https://www.army.mil/rss/static/85.xml",
        "https://www.rand.org/topics/national-security.xml",
        "https://www.af.mil/DesktopModules/ArticleCS/RSS.ashx?ContentType=1",
        "https://www.defenceiq.com/rss/categories/air-forces-military-aircraft",
        "https://www.defenceiq.com/rss/categories/armoured-vehicles",
        "https://www.defenceiq.com/rss/categories/air-land-and-sea-defence-services",
        "https://www.defenceiq.com/rss/categories/defence-technology",
        "https://www.defenceiq.com/rss/categories/army-land-forces",
        "https://www.defenceiq.com/rss/categories/naval-maritime-defence",
        "https://www.defenceiq.com/rss/categories/cyber-defence-and-security",
        "https://oval.mitre.org/news/rss/ovalnews.feed.xml",
        "https://defence-blog.com/feed/",
        "https://www.army-technology.com/feed/",
        "https://www.airforce-technology.com/feed/",
        "https://www.naval-technology.com/news/feed/",
        "https://sociable.co/military-technology/feed/",
        "https://www.defenseone.com/rss/technology/",
        "https://defense-update.com/feed",
        "https://breakingdefense.com/full-rss-feed/?v=2",
        // Government agencies
        "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?ContentType=800&Site=945&max=10",
        "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?max=10&ContentType=1&Site=945",
        "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?ContentType=400&Site=945&max=10",
        "https://nexus.od.nih.gov/all/feed/",
        "https://www.ruralhealthinfo.org/rss/funding/types/grants-and-contracts.xml",
        // Grants
        "https://grants.nih.gov/podcasts/All_About_Grants/AAG_Feed.xml",
        "https://www.nsf.gov/rss/rss_www_events.xml",
        "https://www.nsf.gov/rss/rss_www_funding_pgm_annc_inf.xml",
        "https://www.nsf.gov/news/mmg/rss/rss_www_funding_upcoming.xml",
        "https://www.nsf.gov/rss/rss_www_news.xml",
        // Allied / international defense
        "https://www.gov.uk/government/organisations/ministry-of-defence.atom",
        "https://natowatch.org/news.xml",
        "https://ukdefencejournal.org.uk/feed/",
        "https://russiandefpolicy.com/feed/",
    ]
    .into_iter()
    .map(SourceConfig::rss)
    .collect();

    sources.push(SourceConfig {
        url: "https://www.federalregister.gov/api/v1/documents.json?per_page=20&order=newest".to_string(),
        kind: SourceKind::FederalRegister,
        name: Some("Federal Register".to_string()),
        category: Some("Federal Register".to_string()),
    });

    sources
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    /// Always uses ~/.config/govfeed/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("govfeed")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.database_file)
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Get the OPML path (with tilde expansion), if configured
    pub fn opml_path(&self) -> Option<PathBuf> {
        self.catalog.opml_path.as_deref().map(expand_tilde)
    }
}
