use arcbuddy::{app, config::Config};

fn main() -> anyhow::Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::load_or_default();
    app::run(cfg)
}
