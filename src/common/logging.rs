use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// INFO by default; `RUST_LOG` overrides it.
/// Format: `[HH:MM:SS] [LEVEL] message`
pub fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
