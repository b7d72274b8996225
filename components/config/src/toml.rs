use std::fs::File;
use std::io::{BufReader, Read};

use bitcoin::Network;

use crate::{
    ApiConfig, Config, NetworkConfig, OrdinalsBrc20Config, OrdinalsConfig,
    OrdinalsMetaProtocolsConfig, PgDatabaseConfig, ResourcesConfig, StorageConfig,
    DEFAULT_API_PORT, DEFAULT_BRC20_GENESIS_BLOCK, DEFAULT_BRC20_SELF_MINT_ACTIVATION_BLOCK,
    DEFAULT_LRU_CACHE_SIZE, DEFAULT_MEMORY_AVAILABLE, DEFAULT_ULIMIT, DEFAULT_WORKING_DIR,
};

#[derive(Deserialize, Clone, Debug)]
pub struct PgDatabaseConfigToml {
    pub database: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub search_path: Option<String>,
    pub pool_max_size: Option<usize>,
}

impl PgDatabaseConfigToml {
    fn to_config(self) -> PgDatabaseConfig {
        PgDatabaseConfig {
            dbname: self.database,
            host: self.host,
            port: self.port,
            user: self.username,
            password: self.password,
            search_path: self.search_path,
            pool_max_size: self.pool_max_size,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct OrdinalsConfigToml {
    pub db: PgDatabaseConfigToml,
    pub meta_protocols: Option<OrdinalsMetaProtocolsConfigToml>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct OrdinalsMetaProtocolsConfigToml {
    pub brc20: Option<OrdinalsBrc20ConfigToml>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct OrdinalsBrc20ConfigToml {
    pub enabled: bool,
    pub lru_cache_size: Option<usize>,
    pub genesis_block: Option<u64>,
    pub self_mint_activation_block: Option<u64>,
    pub db: PgDatabaseConfigToml,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfigToml {
    pub working_dir: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResourcesConfigToml {
    pub ulimit: Option<usize>,
    pub cpu_core_available: Option<usize>,
    pub memory_available: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NetworkConfigToml {
    pub network: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiConfigToml {
    pub enabled: bool,
    pub http_port: Option<u16>,
    pub server_version: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ConfigToml {
    pub storage: StorageConfigToml,
    pub ordinals: Option<OrdinalsConfigToml>,
    pub api: Option<ApiConfigToml>,
    pub network: NetworkConfigToml,
    pub resources: ResourcesConfigToml,
}

impl ConfigToml {
    pub fn config_from_file_path(file_path: &str) -> Result<Config, String> {
        let file = File::open(file_path)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;

        let config_file: ConfigToml = match toml::from_slice(&file_buffer) {
            Ok(s) => s,
            Err(e) => {
                return Err(format!("Config file malformatted {}", e));
            }
        };
        ConfigToml::config_from_toml(config_file)
    }

    fn config_from_toml(toml: ConfigToml) -> Result<Config, String> {
        let bitcoin_network = match toml.network.network.as_str() {
            "devnet" | "regtest" => Network::Regtest,
            "testnet" => Network::Testnet,
            "mainnet" => Network::Bitcoin,
            "signet" => Network::Signet,
            _ => return Err("network.network not supported".to_string()),
        };
        let ordinals = match toml.ordinals {
            Some(ordinals) => Some(OrdinalsConfig {
                db: ordinals.db.to_config(),
                meta_protocols: match ordinals.meta_protocols {
                    Some(meta_protocols) => Some(OrdinalsMetaProtocolsConfig {
                        brc20: match meta_protocols.brc20 {
                            Some(brc20) => Some(OrdinalsBrc20Config {
                                enabled: brc20.enabled,
                                lru_cache_size: brc20
                                    .lru_cache_size
                                    .unwrap_or(DEFAULT_LRU_CACHE_SIZE),
                                genesis_block: brc20
                                    .genesis_block
                                    .unwrap_or(DEFAULT_BRC20_GENESIS_BLOCK),
                                self_mint_activation_block: brc20
                                    .self_mint_activation_block
                                    .unwrap_or(DEFAULT_BRC20_SELF_MINT_ACTIVATION_BLOCK),
                                db: brc20.db.to_config(),
                            }),
                            None => None,
                        },
                    }),
                    None => None,
                },
            }),
            None => None,
        };
        let api = match toml.api {
            Some(api) => Some(ApiConfig {
                enabled: api.enabled,
                http_port: api.http_port.unwrap_or(DEFAULT_API_PORT),
                server_version: api.server_version,
            }),
            None => None,
        };
        let config = Config {
            storage: StorageConfig {
                working_dir: toml
                    .storage
                    .working_dir
                    .unwrap_or(DEFAULT_WORKING_DIR.into()),
            },
            ordinals,
            api,
            resources: ResourcesConfig {
                ulimit: toml.resources.ulimit.unwrap_or(DEFAULT_ULIMIT),
                cpu_core_available: toml.resources.cpu_core_available.unwrap_or(num_cpus::get()),
                memory_available: toml
                    .resources
                    .memory_available
                    .unwrap_or(DEFAULT_MEMORY_AVAILABLE),
            },
            network: NetworkConfig {
                network: bitcoin_network,
            },
        };
        Ok(config)
    }
}
