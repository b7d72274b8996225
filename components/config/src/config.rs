use std::path::PathBuf;

use bitcoin::Network;

use crate::toml::ConfigToml;

pub const DEFAULT_WORKING_DIR: &str = "data";
pub const DEFAULT_ULIMIT: usize = 2048;
pub const DEFAULT_MEMORY_AVAILABLE: usize = 8;
pub const DEFAULT_LRU_CACHE_SIZE: usize = 50_000;
pub const DEFAULT_API_PORT: u16 = 3000;

/// First block at which BRC-20 operations are recognized on mainnet.
pub const DEFAULT_BRC20_GENESIS_BLOCK: u64 = 779_832;
/// First block at which 5-byte self-mint BRC-20 tickers are valid on mainnet.
pub const DEFAULT_BRC20_SELF_MINT_ACTIVATION_BLOCK: u64 = 837_090;

#[derive(Clone, Debug)]
pub struct Config {
    pub network: NetworkConfig,
    pub ordinals: Option<OrdinalsConfig>,
    pub api: Option<ApiConfig>,
    pub resources: ResourcesConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub network: Network,
}

#[derive(Clone, Debug)]
pub struct OrdinalsConfig {
    pub db: PgDatabaseConfig,
    pub meta_protocols: Option<OrdinalsMetaProtocolsConfig>,
}

#[derive(Clone, Debug)]
pub struct OrdinalsMetaProtocolsConfig {
    pub brc20: Option<OrdinalsBrc20Config>,
}

#[derive(Clone, Debug)]
pub struct OrdinalsBrc20Config {
    pub enabled: bool,
    pub lru_cache_size: usize,
    pub genesis_block: u64,
    pub self_mint_activation_block: u64,
    pub db: PgDatabaseConfig,
}

/// A Postgres configuration for a single database.
#[derive(Clone, Debug)]
pub struct PgDatabaseConfig {
    pub dbname: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub search_path: Option<String>,
    pub pool_max_size: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub enabled: bool,
    pub http_port: u16,
    pub server_version: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub working_dir: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResourcesConfig {
    pub ulimit: usize,
    pub cpu_core_available: usize,
    pub memory_available: usize,
}

impl Config {
    pub fn from_file_path(file_path: &str) -> Result<Config, String> {
        ConfigToml::config_from_file_path(file_path)
    }

    pub fn expected_cache_path(&self) -> PathBuf {
        let mut destination_path = PathBuf::new();
        destination_path.push(&self.storage.working_dir);
        destination_path
    }

    pub fn devnet_default() -> Config {
        Config {
            storage: StorageConfig {
                working_dir: default_cache_path(),
            },
            resources: ResourcesConfig {
                cpu_core_available: num_cpus::get(),
                memory_available: DEFAULT_MEMORY_AVAILABLE,
                ulimit: DEFAULT_ULIMIT,
            },
            network: NetworkConfig {
                network: Network::Regtest,
            },
            ordinals: Some(OrdinalsConfig {
                db: PgDatabaseConfig {
                    dbname: "ordinals".to_string(),
                    host: "localhost".to_string(),
                    port: 5432,
                    user: "postgres".to_string(),
                    password: Some("postgres".to_string()),
                    search_path: None,
                    pool_max_size: None,
                },
                meta_protocols: None,
            }),
            api: Some(ApiConfig {
                enabled: true,
                http_port: DEFAULT_API_PORT,
                server_version: None,
            }),
        }
    }

    pub fn testnet_default() -> Config {
        let mut default = Config::devnet_default();
        default.network.network = Network::Testnet;
        default
    }

    pub fn mainnet_default() -> Config {
        let mut default = Config::devnet_default();
        default.network.network = Network::Bitcoin;
        default
    }

    pub fn test_default() -> Config {
        let mut config = Self::mainnet_default();
        config.storage.working_dir = "tmp".to_string();
        config.resources.cpu_core_available = 1;
        config.ordinals = Some(OrdinalsConfig {
            db: PgDatabaseConfig {
                dbname: "postgres".to_string(),
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: Some("postgres".to_string()),
                search_path: None,
                pool_max_size: None,
            },
            meta_protocols: Some(OrdinalsMetaProtocolsConfig {
                brc20: Some(OrdinalsBrc20Config {
                    enabled: true,
                    lru_cache_size: DEFAULT_LRU_CACHE_SIZE,
                    genesis_block: DEFAULT_BRC20_GENESIS_BLOCK,
                    self_mint_activation_block: DEFAULT_BRC20_SELF_MINT_ACTIVATION_BLOCK,
                    db: PgDatabaseConfig {
                        dbname: "postgres".to_string(),
                        host: "localhost".to_string(),
                        port: 5432,
                        user: "postgres".to_string(),
                        password: Some("postgres".to_string()),
                        search_path: None,
                        pool_max_size: None,
                    },
                }),
            }),
        });
        config
    }

    pub fn ordinals_brc20_config(&self) -> Option<&OrdinalsBrc20Config> {
        if let Some(OrdinalsConfig {
            meta_protocols:
                Some(OrdinalsMetaProtocolsConfig {
                    brc20: Some(brc20), ..
                }),
            ..
        }) = &self.ordinals
        {
            if brc20.enabled {
                return Some(brc20);
            }
        }
        None
    }

    pub fn assert_ordinals_config(&self) -> Result<(), String> {
        if self.ordinals.is_none() {
            return Err("Config entry for `ordinals` not found in config file.".to_string());
        }
        Ok(())
    }
}

pub fn default_cache_path() -> String {
    let mut cache_path = std::env::current_dir().expect("unable to get current dir");
    cache_path.push("data");
    format!("{}", cache_path.display())
}
