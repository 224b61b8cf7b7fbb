use azure_resource_graph::config::Config;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;

const LOG_CONFIG: &str = "log4rs.yml";

/// log4rs from `log4rs.yml`, or plain console logging at info level.
fn init_logging() -> Result<(), Box<dyn Error>> {
    if std::path::Path::new(LOG_CONFIG).exists() {
        log4rs::init_file(LOG_CONFIG, Default::default())?;
        return Ok(());
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l:5})} {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    init_logging()?;
    dotenv::dotenv().ok();
    log::info!("#Start main()");

    let config = Config::from_env();
    log::debug!("{config:?}");
    let snapshot = azure_resource_graph::run(&config)?;

    log::info!(
        "#End main() {} resources, {} diagnostics",
        snapshot.metadata.total_resources,
        snapshot.metadata.diagnostics
    );
    Ok(())
}
