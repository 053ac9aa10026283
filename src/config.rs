use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Without it the service keeps appointments in memory.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub paging: PagingConfig,
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let db_max_connections = parse_var::<u32>("DB_MAX_CONNECTIONS")
            .filter(|n| *n > 0)
            .unwrap_or(5);

        let defaults = PagingConfig::default();
        let max_page_size = parse_var::<u32>("MAX_PAGE_SIZE")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_page_size);
        let default_page_size = parse_var::<u32>("DEFAULT_PAGE_SIZE")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.default_page_size)
            .min(max_page_size);

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            paging: PagingConfig {
                default_page_size,
                max_page_size,
            },
        })
    }
}
