use std::io::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Install the global logger. `RUST_LOG`, when set, overrides `level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                chrono::Local::now().format(TIME_FORMAT),
                record.target(),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .try_init();
}
