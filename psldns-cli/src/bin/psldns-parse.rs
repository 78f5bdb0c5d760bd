//! Compiles a PSL file (plus four synthetic self-test rules) into the DNS RRset JSON a
//! provider would accept for submission.

use std::fs::File;
use std::io::BufReader;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use psldns_cli::args::{err, print_version, CommonArgs};
use psldns_core::emitter::DEFAULT_TTL;
use psldns_core::{emit, Compiler, DesecProvider};

const EXTRA_RULES: [&str; 4] = [
    "*.wildcard.test",
    "inline.*.wildcard.test",
    "*.inline.*.wildcard.test",
    "!except.inline.*.wildcard.test",
];

fn main() -> Result<()> {
    let common = CommonArgs::parse(std::env::args().skip(1));
    common.init_logging();

    let mut list_providers = false;
    let mut provider_name = "desec".to_string();
    let mut psl_file = None;
    let mut consume_provider = false;

    for arg in common.rest {
        if consume_provider {
            provider_name = arg;
            consume_provider = false;
            continue;
        }
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-V" | "--version" => {
                print_version("psldns-parse");
                return Ok(());
            }
            "-l" => list_providers = true,
            "--provider" => consume_provider = true,
            other if psl_file.is_none() => psl_file = Some(other.to_string()),
            other => err(format!("Unexpected argument: {}.", other)),
        }
    }

    if list_providers {
        println!("Available output formats (default *):");
        println!("* desec");
        return Ok(());
    }

    if provider_name != "desec" {
        err(format!("Unknown provider: {}.", provider_name));
    }

    let psl_file = psl_file.unwrap_or_else(|| err("Missing required argument: psl_file."));
    let file = File::open(&psl_file).with_context(|| format!("Could not open {}", psl_file))?;

    let mut compiler = Compiler::new();
    compiler.process(BufReader::new(file))?;
    for rule in EXTRA_RULES {
        compiler.add_supplementary_rule(rule)?;
    }

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let rrsets = compiler.compile(timestamp)?;
    let provider = DesecProvider::new(common.zone, DEFAULT_TTL);
    let records = emit(&rrsets, &provider);

    println!("{}", serde_json::to_string(&records)?);
    Ok(())
}

fn print_help() {
    let output = owo_colors::Stream::Stdout;
    println!(
        "{}",
        "Print rules from a Public Suffix List (PSL) file as DNS RRsets.".if_supports_color(output, |s| s.purple())
    );
    println!();
    println!(
        "Usage:\tpsldns-parse [{}] [{}]",
        "options".if_supports_color(output, |s| s.green()),
        "psl_file".if_supports_color(output, |s| s.green())
    );
    println!();
    println!("Options:");
    println!("\t-h | --help          print this help message");
    println!("\t-V | --version       print the version of psldns-parse");
    println!("\t-l                   list available output formats");
    println!("\t--provider <name>    output format to use (default: desec)");
    println!("\t--zone <zone>        PSL zone to use");
    println!("\t-v | --verbose       increase output verbosity (repeatable)");
}
