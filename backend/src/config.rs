use rocket::figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    #[serde(alias = "DATABASE_URL")]
    pub database_url: String,
    #[serde(alias = "ADMIN_PASSWORD_HASH")]
    pub admin_password_hash: String,
    #[serde(default = "default_rocket_port", alias = "ROCKET_PORT")]
    pub rocket_port: u16,
    #[serde(default, alias = "SECRET_KEY")]
    pub secret_key: Option<String>,
}

fn default_rocket_port() -> u16 {
    8000
}

impl AppConfig {
    pub fn load() -> Self {
        Figment::new()
            .merge(Toml::file("Config.toml"))
            .merge(Toml::file("../Config.toml"))
            .merge(Env::raw().only(&[
                "DATABASE_URL",
                "ADMIN_PASSWORD_HASH",
                "ROCKET_PORT",
                "SECRET_KEY",
            ]))
            .extract()
            .expect("Failed to load configuration. Ensure Config.toml exists or environment variables are set (DATABASE_URL, ADMIN_PASSWORD_HASH).")
    }
}
