//! stderr logging via `tracing-subscriber`. Audit lines go to stdout and are
//! not affected by the log level.

use anyhow::{anyhow, Result};
use std::io;
use tracing::Level;

/// `-q` wins, then `-v`/`-vv`, then the configured level, then `warn`.
pub fn level_for(verbose: u8, quiet: bool, configured: Option<&str>) -> Result<Level> {
    if quiet {
        return Ok(Level::ERROR);
    }
    match verbose {
        0 => match configured {
            Some(level) => level
                .parse::<Level>()
                .map_err(|_| anyhow!("unknown log level `{level}`")),
            None => Ok(Level::WARN),
        },
        1 => Ok(Level::INFO),
        2 => Ok(Level::DEBUG),
        _ => Ok(Level::TRACE),
    }
}

pub fn init(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_take_precedence_over_config() {
        assert_eq!(level_for(0, false, None).unwrap(), Level::WARN);
        assert_eq!(level_for(0, false, Some("debug")).unwrap(), Level::DEBUG);
        assert_eq!(level_for(1, false, Some("error")).unwrap(), Level::INFO);
        assert_eq!(level_for(2, false, None).unwrap(), Level::DEBUG);
        assert_eq!(level_for(5, true, None).unwrap(), Level::ERROR);
        assert!(level_for(0, false, Some("loud")).is_err());
    }
}
