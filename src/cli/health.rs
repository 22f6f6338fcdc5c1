use std::error::Error;

use tracing::debug;

use crate::api::HealthResponse;
use crate::utils::url::construct_api_url;

pub const HEALTH_ENDPOINT: &str = "api/health";

pub async fn fetch_health(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<HealthResponse, Box<dyn Error>> {
    let url = construct_api_url(base_url, HEALTH_ENDPOINT);
    debug!(%url, "checking backend health");
    let response = client.get(&url).send().await?.error_for_status()?;
    Ok(response.json::<HealthResponse>().await?)
}

pub fn describe_health(base_url: &str, health: &HealthResponse) -> String {
    let mut text = format!("{base_url}: {}", health.status);
    text.push_str(if health.agent_initialized {
        " (agent ready)"
    } else {
        " (agent not initialized)"
    });
    if let Some(backend) = &health.backend {
        text.push_str(&format!("\nbackend: {backend}"));
    }
    text
}

pub async fn check_health(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let health = fetch_health(&client, base_url).await?;
    println!("{}", describe_health(base_url, &health));
    Ok(())
}
