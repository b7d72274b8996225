pub fn generate_toml_config(network: &str) -> String {
    let conf = format!(
        r#"[storage]
working_dir = "data"

[network]
network = "{network}"

[ordinals.db]
database = "ordinals"
host = "localhost"
port = 5432
username = "postgres"
password = "postgres"

[ordinals.meta_protocols.brc20]
enabled = true
lru_cache_size = 10000

[ordinals.meta_protocols.brc20.db]
database = "brc20"
host = "localhost"
port = 5432
username = "postgres"
password = "postgres"

[api]
enabled = true
http_port = 3000

[resources]
ulimit = 2048
cpu_core_available = 6
memory_available = 16
"#,
        network = network.to_lowercase(),
    );
    conf
}
