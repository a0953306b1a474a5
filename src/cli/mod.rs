pub mod config;
pub mod run;

/// Default tracing filter when `RUST_LOG` is unset. Progress bars share
/// stderr with the log output, so routine `info!` lines are held back while
/// they are drawn.
pub fn default_log_filter(progress_bars: bool) -> &'static str {
    if progress_bars {
        "logsift=warn"
    } else {
        "logsift=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_raise_default_filter() {
        assert_eq!(default_log_filter(true), "logsift=warn");
        assert_eq!(default_log_filter(false), "logsift=info");
    }
}
