use atty::Stream;
use simplelog::{ColorChoice, Config, LevelFilter, SimpleLogger, TermLogger, TerminalMode};

use crate::Result;

/// Installs a global logger at the Warn level, using a coloured terminal
/// logger when stdout is a TTY.
pub fn init() -> Result<()> {
    init_with_level(LevelFilter::Warn)
}

/// Installs a global logger at the given level.
pub fn init_with_level(level: LevelFilter) -> Result<()> {
    let res = if atty::is(Stream::Stdout) {
        TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    } else {
        SimpleLogger::init(level, Config::default())
    };
    res.map_err(Into::into)
}
