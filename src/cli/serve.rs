use anyhow::Result;

use crate::api;
use crate::core::{AppConfig, init_tracing};

pub async fn run(host: String, port: String) -> Result<()> {
    // axum logs rejections from built-in extractors with the `axum::rejection`
    // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
    init_tracing(&format!(
        "{}=debug,tower_http=debug,axum::rejection=trace",
        env!("CARGO_CRATE_NAME")
    ));

    let config = AppConfig::from_env()?;
    api::serve(host, port, config).await
}
