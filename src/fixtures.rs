#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::Duration;

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080)]
        pub port: u16,

        /// Enable debug mode.
        #[config(default = false)]
        pub debug: bool,

        /// Database settings.
        #[config(nested)]
        pub database: TestDbConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    #[test]
    fn test_config_loads_defaults() {
        let config = TestConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- Every shape, plus a key three levels deep ------------------------------

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct ServiceConfig {
        /// Service name.
        #[config(default = "svc")]
        pub name: String,

        /// Request timeout.
        #[config(default = "30s")]
        pub timeout: Duration,

        #[config(default = ["a", "b"])]
        pub tags: Vec<String>,

        #[config(default = [1, 2])]
        pub ports: Vec<u16>,

        #[config(default = 0.5)]
        pub ratio: f64,

        pub label: Option<String>,

        #[config(nested)]
        pub server: ServerConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct ServerConfig {
        #[config(default = "0.0.0.0")]
        pub bind: String,

        #[config(default = 16)]
        pub max_connections: u32,

        #[config(nested)]
        pub tls: TlsConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TlsConfig {
        /// Serve over TLS.
        #[config(default = false)]
        pub enabled: bool,
    }

    // -- Two fields that normalize to the same key ------------------------------

    #[derive(Config, Serialize, Debug)]
    pub struct CollidingConfig {
        #[config(default = 1)]
        #[serde(rename = "Port")]
        pub port_upper: u16,

        #[config(default = 2)]
        pub port: u16,
    }

    // -- Kebab-case serde names, and a list with an empty default ---------------

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "kebab-case")]
    pub struct KebabConfig {
        /// Connection limit.
        #[config(default = 1)]
        pub max_conn: u32,

        #[config(default = [])]
        pub extra_ports: Vec<u16>,

        #[config(nested)]
        pub pool: PoolConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "kebab-case")]
    pub struct PoolConfig {
        #[config(default = 30)]
        pub idle_secs: u32,
    }

    // -- A required field without a default -------------------------------------

    #[derive(Config, Serialize, Deserialize, Debug)]
    pub struct RequiredConfig {
        pub token: String,
    }
}
