use std::env;

#[derive(Clone)]
pub struct Config {
    pub db_url: String,
    pub bind_addr: String,
    pub bot_token: Option<String>,
    pub token_secret: String,
    pub webapp_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let db_url = env::var("DB_URL").unwrap_or_else(|_| "sqlite:anonimka.db".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
        let bot_token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.is_empty());
        let token_secret = env::var("USER_TOKEN_SECRET")
            .or_else(|_| env::var("TOKEN_SECRET"))
            .unwrap_or_else(|_| "default-secret".to_string());
        let webapp_url = env::var("WEBAPP_URL")
            .unwrap_or_else(|_| "https://anonimka.online/webapp".to_string());
        Self {
            db_url,
            bind_addr,
            bot_token,
            token_secret,
            webapp_url,
        }
    }
}
