//! Queries the PSL via DNS and checks the PSL status of a domain.
//!
//! Prints `public`/`private`, followed by the public suffix covering the queried domain, or
//! `unknown` if the domain is affected by a rule this client can't fully decode (spec §4.7's
//! `UnsupportedRule`). Exit codes: 0 (public), 1 (private), 2 (unknown).

use std::process;

use anyhow::Result;

use psldns_cli::args::{err, print_version, CommonArgs};
use psldns_core::{Client, PslError, TcpTransport};

fn main() -> Result<()> {
    let common = CommonArgs::parse(std::env::args().skip(1));
    common.init_logging();
    let resolver = common.require_resolver();
    let zone = common.zone.clone();
    let timeout = common.timeout;

    let mut show_rules = false;
    let mut show_checksum = false;
    let mut domain = None;

    for arg in common.rest {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-V" | "--version" => {
                print_version("psldns-query");
                return Ok(());
            }
            "-l" => show_rules = true,
            "-c" => show_checksum = true,
            other if domain.is_none() => domain = Some(other.to_string()),
            other => err(format!("Unexpected argument: {}.", other)),
        }
    }

    let domain = domain.unwrap_or_else(|| err("Missing required argument: domain."));

    let transport = TcpTransport::new(resolver, timeout);
    let client = Client::new(transport, &zone)?;

    let status = match client.get_public_suffix(&domain) {
        Ok(public_suffix) => {
            let is_public_suffix = client.is_public_suffix(&domain, Some(&public_suffix))?;
            println!("{} {}", if is_public_suffix { "public" } else { "private" }, public_suffix);
            i32::from(!is_public_suffix)
        }
        Err(PslError::UnsupportedRule(_)) => {
            println!("unknown");
            2
        }
        Err(e) => return Err(e.into()),
    };

    if show_rules {
        for rule in client.get_rules(&domain)? {
            println!("{}", rule);
        }
    }

    if show_checksum {
        if let Some(checksum) = client.get_checksum()? {
            println!("{}", checksum);
        }
    }

    process::exit(status);
}

fn print_help() {
    println!("Query the PSL via DNS and check the PSL status of a domain.");
    println!();
    println!("Usage:\tpsldns-query [options] domain");
    println!();
    println!("Returns \"public\" or \"private\", followed by the public suffix that covers");
    println!("the queried domain, or \"unknown\" if the domain is affected by a rule this");
    println!("client cannot fully decode.");
    println!();
    println!("Options:");
    println!("\t-h | --help          print this help message");
    println!("\t-V | --version       print the version of psldns-query");
    println!("\t-l                   show the set of applicable rules");
    println!("\t-c                   show the PSL checksum");
    println!("\t--resolver <host>    DNS resolver to use (required)");
    println!("\t--timeout <secs>     DNS query timeout in seconds (default: 5)");
    println!("\t--zone <zone>        PSL zone to use");
    println!("\t-v | --verbose       increase output verbosity (repeatable)");
    println!();
    println!("Exit codes: 0 (public), 1 (private), or 2 (unknown).");
}
