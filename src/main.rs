//! hyperfx CLI
//!
//! Operator tooling around the branch ledger bootstrap and conversion
//! arithmetic.
//!
//! # Usage
//!
//! ```bash
//! # First start of a deployment: create the namespace file
//! hyperfx namespace init --config hyperfx.json
//!
//! # List the system account ids derived from the namespace
//! hyperfx accounts --config hyperfx.json --format json
//!
//! # Provision the system accounts against an in-process ledger
//! hyperfx bootstrap --config hyperfx.json
//!
//! # Quote a conversion
//! hyperfx convert --config hyperfx.json --direction SELL --amount 10000 --currency EUR --to local
//! ```

use hyperfx_core::bootstrap::{bootstrap_system_accounts, BootstrapError, SystemAccountTable};
use hyperfx_core::config::Config;
use hyperfx_core::conversion::{
    foreign_from_local, local_from_foreign, ConversionEngine, ConversionError, Rate, TradeDirection,
};
use hyperfx_core::core::currency::{CurrencyId, ScaleRegistry};
use hyperfx_core::core::identity::{Namespace, NamespaceError, NamespaceFile};
use hyperfx_core::ledger::InMemoryLedger;
use log::{info, warn};
use rust_decimal::Decimal;
use std::fmt::Display;
use std::process;

fn print_usage() {
    eprintln!(
        r#"hyperfx: FX branch ledger bootstrap and conversion

USAGE:
    hyperfx <COMMAND> [OPTIONS]

COMMANDS:
    namespace init    Generate and persist the deployment namespace
    namespace show    Print the persisted namespace
    accounts          Print the derived system account ids
    bootstrap         Provision system accounts (in-process ledger, dry run)
    convert           Convert an amount between local and foreign currency
    help              Show this message

OPTIONS (all commands):
    --config <FILE>       Path to the JSON configuration file

OPTIONS (accounts, bootstrap):
    --format <FORMAT>     Output format: text (default) or json

OPTIONS (convert):
    --direction <DIR>     BUY or SELL (house buys or sells foreign currency)
    --amount <N>          Amount in minor units of the source currency
    --currency <CCY>      Foreign currency, alpha or numeric code
    --to <SIDE>           local (foreign -> local) or foreign (local -> foreign)
    --rate <RATE>         Use this rate instead of the configured one

EXAMPLES:
    hyperfx namespace init --config hyperfx.json
    hyperfx accounts --config hyperfx.json --format json
    hyperfx convert --config hyperfx.json --direction SELL --amount 10000 --currency EUR --to local"#
    );
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Options shared by all commands.
#[derive(Default)]
struct Options {
    config: Option<String>,
    format: String,
    direction: Option<String>,
    amount: Option<String>,
    currency: Option<String>,
    to: Option<String>,
    rate: Option<String>,
}

fn parse_options(args: &[String]) -> Options {
    let mut options = Options {
        format: "text".to_string(),
        ..Default::default()
    };
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let value = args.get(i).cloned().unwrap_or_else(|| {
            eprintln!("{} requires a value", flag);
            process::exit(1);
        });
        match flag {
            "--config" => options.config = Some(value),
            "--format" => options.format = value,
            "--direction" => options.direction = Some(value),
            "--amount" => options.amount = Some(value),
            "--currency" => options.currency = Some(value),
            "--to" => options.to = Some(value),
            "--rate" => options.rate = Some(value),
            _ => {
                eprintln!("Unknown option: {}", flag);
                process::exit(1);
            }
        }
        i += 1;
    }
    options
}

fn load_config(options: &Options) -> Config {
    let path = options
        .config
        .as_deref()
        .unwrap_or_else(|| fail("--config <FILE> is required"));
    let config = Config::load(path).unwrap_or_else(|e| fail(e));
    config.validate().unwrap_or_else(|e| fail(e));
    config
}

fn namespace_file(config: &Config) -> NamespaceFile {
    NamespaceFile::in_dir(config.data_dir().unwrap_or_else(|e| fail(e)))
}

/// Load the namespace, generating one only when the config allows it.
fn resolve_namespace(config: &Config) -> Namespace {
    let file = namespace_file(config);
    match file.load() {
        Ok(namespace) => namespace,
        Err(NamespaceError::NotFound { path }) if config.namespace.auto_generate => {
            warn!(
                "namespace file {} missing, generating (namespace.auto_generate = true)",
                path.display()
            );
            file.create().unwrap_or_else(|e| fail(e))
        }
        Err(e) => fail(format!(
            "{} (run `hyperfx namespace init` on the first start of a deployment)",
            e
        )),
    }
}

fn cmd_namespace(args: &[String]) {
    let (sub, rest) = args
        .split_first()
        .unwrap_or_else(|| fail("namespace requires a subcommand: init or show"));
    let options = parse_options(rest);
    let config = load_config(&options);
    let file = namespace_file(&config);

    match sub.as_str() {
        "init" => {
            let namespace = file.create().unwrap_or_else(|e| fail(e));
            println!("{}", namespace);
        }
        "show" => {
            let namespace = file.load().unwrap_or_else(|e| fail(e));
            println!("{}", namespace);
        }
        other => fail(format!("unknown namespace subcommand: {}", other)),
    }
}

#[derive(serde::Serialize)]
struct AccountOutput {
    currency: String,
    ledger: u32,
    role: String,
    code: u16,
    id: String,
    uuid: String,
}

fn cmd_accounts(args: &[String]) {
    let options = parse_options(args);
    let config = load_config(&options);
    let registry = config.registry().unwrap_or_else(|e| fail(e));
    let namespace = namespace_file(&config).load().unwrap_or_else(|e| fail(e));
    let table = SystemAccountTable::derive(&registry, &namespace);

    if options.format == "json" {
        let output: Vec<AccountOutput> = table
            .entries()
            .map(|(currency, role, id)| AccountOutput {
                currency: currency.to_string(),
                ledger: currency.code(),
                role: role.name().to_string(),
                code: role.code(),
                id: id.to_string(),
                uuid: id.to_uuid().to_string(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| fail(e));
        println!("{}", json);
    } else {
        println!("Namespace: {}", namespace);
        print!("{}", table);
    }
}

fn cmd_bootstrap(args: &[String]) {
    let options = parse_options(args);
    let config = load_config(&options);
    let registry = config.registry().unwrap_or_else(|e| fail(e));
    let namespace = resolve_namespace(&config);
    let ledger = InMemoryLedger::new();

    let policy = config.bootstrap.failure_policy;
    let report = match bootstrap_system_accounts(&registry, &namespace, &ledger, policy) {
        Ok((table, report)) => {
            info!("{} system accounts resolved", table.len());
            report
        }
        Err(BootstrapError::AccountsRejected(report)) => {
            eprint!("{}", report);
            fail("system account bootstrap rejected by the ledger");
        }
        Err(e) => fail(e),
    };

    if options.format == "json" {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| fail(e));
        println!("{}", json);
    } else {
        print!("{}", report);
    }
}

fn cmd_convert(args: &[String]) {
    let options = parse_options(args);
    let config = load_config(&options);
    let registry = config.registry().unwrap_or_else(|e| fail(e));

    let direction: TradeDirection = options
        .direction
        .as_deref()
        .unwrap_or_else(|| fail("--direction <BUY|SELL> is required"))
        .parse()
        .unwrap_or_else(|e: String| fail(e));
    let amount: u64 = options
        .amount
        .as_deref()
        .unwrap_or_else(|| fail("--amount <N> is required"))
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid amount: {}", e)));
    let currency: CurrencyId = options
        .currency
        .as_deref()
        .unwrap_or_else(|| fail("--currency <CCY> is required"))
        .parse()
        .unwrap_or_else(|e| fail(e));
    let to_local = match options.to.as_deref() {
        Some("local") => true,
        Some("foreign") => false,
        _ => fail("--to must be 'local' or 'foreign'"),
    };

    let result = match options.rate.as_deref() {
        Some(raw) => {
            let value: Decimal = raw
                .parse()
                .unwrap_or_else(|e| fail(format!("invalid rate '{}': {}", raw, e)));
            let rate = Rate::new(value).unwrap_or_else(|e| fail(e));
            convert_with_rate(&registry, direction, amount, currency, to_local, &rate)
        }
        None => {
            let rates = config.rate_source(&registry).unwrap_or_else(|e| fail(e));
            let engine = ConversionEngine::new(registry.clone(), rates);
            if to_local {
                engine.local_from_foreign(direction, amount, currency)
            } else {
                engine.foreign_from_local(direction, amount, currency)
            }
        }
    }
    .unwrap_or_else(|e| fail(e));

    let (from, to) = if to_local {
        (currency, registry.local())
    } else {
        (registry.local(), currency)
    };
    println!("{} {} {} -> {} {}", direction, amount, from, result, to);
}

fn convert_with_rate(
    registry: &ScaleRegistry,
    direction: TradeDirection,
    amount: u64,
    currency: CurrencyId,
    to_local: bool,
    rate: &Rate,
) -> Result<u64, ConversionError> {
    if to_local {
        local_from_foreign(registry, direction, amount, currency, rate)
    } else {
        foreign_from_local(registry, direction, amount, currency, rate)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "namespace" => cmd_namespace(rest),
        "accounts" => cmd_accounts(rest),
        "bootstrap" => cmd_bootstrap(rest),
        "convert" => cmd_convert(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
