use settle_browser::{launch, open_page, BrowserConfig, PageSession, WaitConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let frontend = std::env::var("FRONTEND_URL").unwrap_or_else(|_| "https://example.com".to_string());
    let headless = std::env::var("HEADLESS").map_or(true, |v| v != "false");

    let browser = launch(&BrowserConfig {
        headless,
        ..BrowserConfig::default()
    })
    .await?;

    let page = open_page(browser.browser(), "about:blank").await?;
    let network = page.network_monitor().await?;
    let session = PageSession::new(page, network, frontend).with_config(WaitConfig::patient());

    session.navigate("/").await?;
    session.wait_for_idle_network().await?;

    let heading = session.element_text("h1").await?;
    println!("Settled on page with heading: {}", heading.trim());

    drop(session);
    browser.close().await?;
    Ok(())
}
