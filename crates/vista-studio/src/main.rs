mod page;
mod turntable;

use vista_engine::logging::{init_logging, LoggingConfig};
use vista_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "vista studio".to_string(),
        initial_size: LogicalSize::new(1100.0, 420.0),
        ..Default::default()
    };

    Runtime::run(config, page::StudioPage::new())
}
