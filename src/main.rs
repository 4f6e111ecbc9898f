use anyhow::Context;
use shelf_app::Application;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        snapshot = ?settings.database.snapshot_path,
        "shelf-app bootstrap starting"
    );

    let app = Application::build(&settings).await?;
    app.serve(&settings).await
}
