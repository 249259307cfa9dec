//! Server command implementation

use anyhow::Result;
use finsage_server::ServerConfig;

pub async fn cmd_serve(host: &str, port: u16, no_auth: bool) -> Result<()> {
    println!("🚀 Starting FinSage web server...");
    println!("   Listening: http://{}:{}", host, port);

    let config = ServerConfig::from_env(!no_auth);

    if no_auth {
        println!("   ⚠️  Authentication: DISABLED (--no-auth)");
    } else if config.api_keys.is_empty() {
        println!("   🔒 Authentication: ENABLED, but FINSAGE_API_KEYS is empty");
    } else {
        println!(
            "   🔒 Authentication: ENABLED ({} API key(s))",
            config.api_keys.len()
        );
    }
    if !config.allowed_origins.is_empty() {
        println!("   CORS origins: {}", config.allowed_origins.join(", "));
    }

    finsage_server::serve(host, port, config).await
}
