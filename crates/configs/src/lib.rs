use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

/// Largest accepted logo upload unless configured otherwise (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `compact` (default) or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), log_format: default_log_format() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_submissions_file")]
    pub submissions_file: String,
    #[serde(default = "default_current_logo_file")]
    pub current_logo_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            submissions_file: default_submissions_file(),
            current_logo_file: default_current_logo_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// The single identity allowed to approve or reject submissions.
    #[serde(default)]
    pub admin_email: String,
    /// HS256 secret shared with the identity provider that signs session tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { admin_email: String::new(), jwt_secret: default_jwt_secret() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_uploads_dir")]
    pub dir: String,
    /// URL prefix under which stored logos are served.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            public_prefix: default_public_prefix(),
            max_bytes: default_max_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_log_format() -> String { "compact".into() }
fn default_data_dir() -> String { "data".into() }
fn default_submissions_file() -> String { "submissions.json".into() }
fn default_current_logo_file() -> String { "current_logo.json".into() }
fn default_jwt_secret() -> String { "dev-secret-change-me".into() }
fn default_uploads_dir() -> String { "public/uploads".into() }
fn default_public_prefix() -> String { "/uploads".into() }
fn default_max_bytes() -> u64 { DEFAULT_MAX_UPLOAD_BYTES }
fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/svg+xml", "image/gif"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Load `CONFIG_PATH` (default `config.toml`); a missing file yields the defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_or_default(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

/// Like `load_from_file`, but a missing file yields the defaults.
/// Unreadable or malformed files are still errors.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
    match load_from_file(path) {
        Ok(cfg) => Ok(cfg),
        Err(e) if e.downcast_ref::<std::io::Error>().map_or(false, |io| io.kind() == std::io::ErrorKind::NotFound) => {
            Ok(AppConfig::default())
        }
        Err(e) => Err(e.context(format!("loading config {path}"))),
    }
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), fall back to defaults when the file
    /// is absent, overlay environment variables, then validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from a variable lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = get("SERVER_HOST") { self.server.host = host; }
        if let Some(port) = get("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) { self.server.port = port; }
        if let Some(w) = get("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(fmt) = get("LOG_FORMAT") { self.server.log_format = fmt; }
        if let Some(dir) = get("DATA_DIR") { self.storage.data_dir = dir; }
        if let Some(dir) = get("UPLOADS_DIR") { self.uploads.dir = dir; }
        if let Some(email) = get("ADMIN_EMAIL") { self.auth.admin_email = email; }
        if let Some(secret) = get("JWT_SECRET") { self.auth.jwt_secret = secret; }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        self.auth.normalize_and_validate()?;
        self.uploads.normalize_and_validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir is empty"));
        }
        if self.submissions_file.trim().is_empty() || self.current_logo_file.trim().is_empty() {
            return Err(anyhow!("storage file names must not be empty"));
        }
        if self.submissions_file == self.current_logo_file {
            return Err(anyhow!("storage.submissions_file and storage.current_logo_file must differ"));
        }
        Ok(())
    }

    pub fn submissions_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.submissions_file)
    }

    pub fn current_logo_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.current_logo_file)
    }
}

impl AuthConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        self.admin_email = self.admin_email.trim().to_ascii_lowercase();
        if self.admin_email.is_empty() {
            return Err(anyhow!("auth.admin_email is empty; set it in config.toml or ADMIN_EMAIL"));
        }
        if !self.admin_email.contains('@') {
            return Err(anyhow!("auth.admin_email is not an email address"));
        }
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }
}

impl UploadConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        if self.dir.trim().is_empty() {
            return Err(anyhow!("uploads.dir is empty"));
        }
        if !self.public_prefix.starts_with('/') {
            self.public_prefix = format!("/{}", self.public_prefix);
        }
        while self.public_prefix.len() > 1 && self.public_prefix.ends_with('/') {
            self.public_prefix.pop();
        }
        if self.max_bytes == 0 {
            return Err(anyhow!("uploads.max_bytes must be > 0"));
        }
        if self.allowed_types.is_empty() {
            return Err(anyhow!("uploads.allowed_types must list at least one media type"));
        }
        for t in self.allowed_types.iter_mut() {
            *t = t.trim().to_ascii_lowercase();
        }
        Ok(())
    }
}
