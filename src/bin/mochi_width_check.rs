//! Compare double-width providers
//!
//! Lists the code points in a range on which the configured width provider
//! disagrees with the others.

use std::process::ExitCode;

use clap::Parser;

use mochi_vtcore::width::{disagreements, provider_for};
use mochi_vtcore::{CliArgs, EmulatorConfig, WidthProviderKind};

#[derive(Parser, Debug)]
#[command(name = "mochi-width-check")]
#[command(version)]
#[command(about = "Report code points where double-width tables disagree", long_about = None)]
struct WidthArgs {
    /// First code point, hex
    #[arg(long, value_name = "HEX", default_value = "0", value_parser = parse_hex)]
    from: u32,

    /// Last code point, hex
    #[arg(long, value_name = "HEX", default_value = "FFFF", value_parser = parse_hex)]
    to: u32,

    /// Print each code point, not just the counts
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    config: CliArgs,
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("U+").trim_start_matches("0x");
    u32::from_str_radix(digits, 16).map_err(|e| format!("'{}' is not a hex code point: {}", s, e))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = WidthArgs::parse();
    if args.from > args.to {
        eprintln!("--from must not exceed --to");
        return ExitCode::FAILURE;
    }
    let config = match EmulatorConfig::load_with_args(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        },
    };

    let configured = provider_for(config.width_provider);
    println!(
        "{} (ambiguous {}) over U+{:04X}..U+{:04X}",
        configured.name(),
        if config.ambiguous_as_wide { "wide" } else { "narrow" },
        args.from,
        args.to
    );
    for kind in WidthProviderKind::ALL {
        if kind == config.width_provider {
            continue;
        }
        let other = provider_for(kind);
        let differing = disagreements(
            configured.as_ref(),
            other.as_ref(),
            args.from..=args.to,
            config.ambiguous_as_wide,
        );
        println!("  vs {}: {} code points differ", kind, differing.len());
        if args.verbose {
            for cp in differing {
                let c = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
                println!(
                    "    U+{:04X} {} {} / {}",
                    cp,
                    c,
                    configured.is_double_width(cp, config.ambiguous_as_wide),
                    other.is_double_width(cp, config.ambiguous_as_wide)
                );
            }
        }
    }
    ExitCode::SUCCESS
}
