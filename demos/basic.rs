use std::time::Duration;

use storage_net::{NetClient, Options, ResponseClass};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let api_url = std::env::var("STORAGE_API_URL")?;
    let download_url = std::env::var("STORAGE_DOWNLOAD_URL")?;

    let mut options = Options::default()
        .with_max_retries(3)
        .with_retry_interval(Duration::from_secs(1));
    if let Ok(proxy) = std::env::var("STORAGE_PROXY") {
        options = options.with_proxy_address(proxy);
    }
    let net = NetClient::new(options);

    let response = net
        .survive(|| net.post(&api_url, r#"[{"a":"us"}]"#))
        .await?;
    if response.class() == ResponseClass::RateLimited {
        anyhow::bail!("API is rate limiting this client");
    }
    println!("API answered {}", response.status);

    let content = net.survive(|| net.get_content(&download_url)).await?;
    println!("downloaded {} bytes", content.len());

    Ok(())
}
