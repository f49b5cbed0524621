use anyhow::Result;

use tui_media_app::config::AppConfig;
use tui_media_app::internal::ui::app::App;
use tui_media_app::tui;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get logging settings
    let config = AppConfig::load();

    // Try to initialize the terminal first so we can decide where tracing
    // should write. When the TUI is running we must avoid writing logs to
    // stderr/stdout (which would corrupt the UI), so logs go to a rotating
    // file. If TUI init fails we enable console logging instead.
    match tui::init() {
        Ok(terminal) => {
            let log_dir = config.logging.log_directory.as_deref().unwrap_or("logs");
            let file_appender = tracing_appender::rolling::daily(log_dir, "tui-media-app.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            // RUST_LOG takes precedence over the configured filter.
            let env_filter = match std::env::var("RUST_LOG") {
                Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
                Err(_) => {
                    let mut filter_str = config.logging.level.to_string();
                    for (module, level) in &config.logging.module_levels {
                        filter_str.push_str(&format!(",{}={}", module, level));
                    }
                    tracing_subscriber::EnvFilter::new(filter_str)
                }
            };

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .init();

            let mut app = App::new(config);
            let res = app.run(terminal).await;

            // Restore terminal state before exiting so the console is usable again.
            tui::restore()?;

            if let Err(err) = &res {
                eprintln!("{err:?}");
            }

            res
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();

            eprintln!("Failed to initialize TUI: {e:?}");
            Err(e)
        }
    }
}
