use vantage::{ViewerApp, ViewerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ViewerConfig::default();
    log::info!(
        "starting viewer, model {:?}, texture {:?}",
        config.model_path,
        config.texture_path
    );

    let app = ViewerApp::new(config);
    app.run();

    Ok(())
}
