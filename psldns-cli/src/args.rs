//! The `--zone`/`--resolver`/`--timeout`/`-v` options every binary shares, plus the
//! `err`/`print_version` helpers used by all three `main`s.

use std::process;
use std::time::Duration;

pub const DEFAULT_ZONE: &str = "query.publicsuffix.zone";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

enum ConsumeNext {
    Zone,
    Resolver,
    Timeout,
}

/// The flags every binary accepts. Whatever's left over (positional arguments and
/// binary-specific flags) is returned in `rest`, in original order, for the caller to
/// interpret itself.
#[derive(Debug)]
pub struct CommonArgs {
    pub zone: String,
    pub resolver: Option<String>,
    pub timeout: Duration,
    pub verbosity: u8,
    pub rest: Vec<String>,
}

impl CommonArgs {
    /// Consumes `env::args().skip(1)`-style tokens, pulling out the options every binary
    /// shares.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut zone = DEFAULT_ZONE.to_string();
        let mut resolver = None;
        let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        let mut verbosity = 0u8;
        let mut rest = Vec::new();
        let mut consume_next = None;

        for arg in args {
            if let Some(to_consume) = consume_next.take() {
                match to_consume {
                    ConsumeNext::Zone => zone = arg,
                    ConsumeNext::Resolver => resolver = Some(arg),
                    ConsumeNext::Timeout => match arg.parse::<u64>() {
                        Ok(secs) => timeout = Duration::from_secs(secs),
                        Err(_) => err(format!("Invalid timeout: {}.", arg)),
                    },
                }
                continue;
            }

            match arg.as_str() {
                "--zone" => consume_next = Some(ConsumeNext::Zone),
                "--resolver" => consume_next = Some(ConsumeNext::Resolver),
                "--timeout" => consume_next = Some(ConsumeNext::Timeout),
                "-v" | "--verbose" => verbosity = verbosity.saturating_add(1),
                _ => rest.push(arg),
            }
        }

        CommonArgs { zone, resolver, timeout, verbosity, rest }
    }

    /// Resolver is mandatory for any binary that actually queries a zone; `psldns-parse`
    /// never calls this.
    pub fn require_resolver(&self) -> String {
        self.resolver.clone().unwrap_or_else(|| err("--resolver <host> is required."))
    }

    pub fn init_logging(&self) {
        let level = match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        };
        env_logger::Builder::new().filter_level(level).init();
    }
}

pub fn err(msg: impl AsRef<str>) -> ! {
    eprintln!("{}", msg.as_ref());
    process::exit(1)
}

pub fn print_version(bin: &str) {
    println!("{} v{}", bin, env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shared_flags_and_leaves_the_rest() {
        let args = CommonArgs::parse(
            ["--zone", "zone.example", "--timeout", "9", "-v", "-v", "file.dat"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(args.zone, "zone.example");
        assert_eq!(args.timeout, Duration::from_secs(9));
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.rest, vec!["file.dat".to_string()]);
    }

    #[test]
    fn defaults_match_the_reference_provider() {
        let args = CommonArgs::parse(std::iter::empty());
        assert_eq!(args.zone, DEFAULT_ZONE);
        assert_eq!(args.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(args.resolver.is_none());
    }
}
