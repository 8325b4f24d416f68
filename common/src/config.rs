#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    /// A full connection URL. Takes precedence over the individual fields.
    #[arg(id = "db-url", long, env = "DB_URL")]
    pub url: Option<String>,
    #[arg(id = "db-user", long, env = "DB_USER", default_value = "deptrail")]
    pub username: String,
    #[arg(
        id = "db-password",
        long,
        env = "DB_PASSWORD",
        default_value = "deptrail"
    )]
    pub password: String,
    #[arg(id = "db-host", long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(id = "db-port", long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(id = "db-name", long, env = "DB_NAME", default_value = "deptrail")]
    pub name: String,
    #[arg(id = "db-min-conn", long, env = "DB_MIN_CONN", default_value_t = 1)]
    pub min_conn: u32,
    #[arg(id = "db-max-conn", long, env = "DB_MAX_CONN", default_value_t = 10)]
    pub max_conn: u32,
}

impl Database {
    /// Build a configuration from the `DB_*` environment variables alone.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        #[derive(clap::Parser)]
        struct Opts {
            #[command(flatten)]
            database: Database,
        }

        Ok(<Opts as clap::Parser>::try_parse_from(["deptrail"])?.database)
    }

    pub fn to_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }
}
