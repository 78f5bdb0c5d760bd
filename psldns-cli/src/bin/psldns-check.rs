//! Replays a PSL file against a live zone and reports where the two disagree.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};

use psldns_cli::args::{err, print_version, CommonArgs};
use psldns_core::{Checker, Client, TcpTransport};

fn main() -> Result<()> {
    let common = CommonArgs::parse(std::env::args().skip(1));
    common.init_logging();
    let resolver = common.require_resolver();
    let zone = common.zone.clone();
    let timeout = common.timeout;

    let mut psl_file = None;
    for arg in common.rest {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-V" | "--version" => {
                print_version("psldns-check");
                return Ok(());
            }
            other if psl_file.is_none() => psl_file = Some(other.to_string()),
            other => err(format!("Unexpected argument: {}.", other)),
        }
    }

    let psl_file = psl_file.unwrap_or_else(|| err("Missing required argument: psl_file."));

    let transport = TcpTransport::new(resolver, timeout);
    let client = Client::new(transport, &zone)?;
    let mut checker = Checker::new(client);

    let file = File::open(&psl_file).with_context(|| format!("Could not open {}", psl_file))?;
    checker.process(BufReader::new(file))?;
    checker.verify_checksum()?;

    println!("{} rules with {} inconsistencies found", checker.checked, checker.errors.len());
    for inconsistency in &checker.errors {
        println!("Rule {} not in {:?}", inconsistency.rule, inconsistency.rules_in_zone);
    }

    Ok(())
}

fn print_help() {
    println!("Check rules from the Public Suffix List (PSL) via DNS and output inconsistencies.");
    println!();
    println!("Usage:\tpsldns-check [options] psl_file");
    println!();
    println!("Options:");
    println!("\t-h | --help          print this help message");
    println!("\t-V | --version       print the version of psldns-check");
    println!("\t--resolver <host>    DNS resolver to use (required)");
    println!("\t--timeout <secs>     DNS query timeout in seconds (default: 5)");
    println!("\t--zone <zone>        PSL zone to use");
    println!("\t-v | --verbose       increase output verbosity (repeatable)");
}
