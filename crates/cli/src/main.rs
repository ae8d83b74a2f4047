mod config;
mod decls;
mod query;


use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lang_check::{Resolver, ResolverConfig};
use lang_store::{SnapshotCache, Store};
use lang_ty::{ComplexType, Scope};
use miette::{IntoDiagnostic, Result};
use smol_str::SmolStr;

#[derive(Parser, Debug)]
#[command(author, version, about = "Type inference queries over declaration files")]
struct Cli {
    /// Path to infer.toml (default: search upward from the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra declaration files, loaded after the configured ones
    #[arg(long = "decl", value_name = "PATH", global = true)]
    decls: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pins declared at a path (`Foo`, `Foo#bar`, `Foo.baz`)
    Pins { path: String },
    /// Ancestry of a namespace, nearest first
    Ancestors {
        namespace: String,
        /// Walk the class-level (singleton) ancestry
        #[arg(long)]
        class: bool,
    },
    /// Methods visible on a namespace
    Methods {
        namespace: String,
        #[arg(long)]
        class: bool,
    },
    /// Constants visible inside a namespace
    Constants { namespace: String },
    /// Resolve a constant name from a list of gates
    Resolve {
        name: String,
        /// Enclosing namespaces, innermost first
        #[arg(long = "gate", value_name = "NAMESPACE")]
        gates: Vec<String>,
    },
    /// Infer `RECEIVER.METHOD(args...)` where operands are given as types
    Call {
        receiver: String,
        method: String,
        #[arg(long = "arg", value_name = "TYPE")]
        args: Vec<String>,
        /// Pass `&:NAME` as the block
        #[arg(long, value_name = "NAME")]
        block_symbol: Option<String>,
    },
}

fn scope(class: bool) -> Scope {
    if class {
        Scope::Class
    } else {
        Scope::Instance
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse();

    let config_path = match args.config {
        Some(path) => Some(path),
        None => config::find_config(&std::env::current_dir().into_diagnostic()?),
    };
    let (config, mut declarations) = match &config_path {
        Some(path) => {
            let config = config::load_config(path)?;
            let dir = path.parent().map(PathBuf::from).unwrap_or_default();
            let declarations = config.declaration_paths(&dir);
            (config, declarations)
        }
        None => {
            log::info!("no infer.toml found, using --decl files only");
            (config::InferConfig::default(), Vec::new())
        }
    };
    declarations.extend(args.decls);

    let workspace = decls::load_workspace(&declarations)?;
    let cache = SnapshotCache::new();
    let key = config_path.unwrap_or_default();
    let snapshot = cache.refresh(&key, workspace.checksum, || Store::from_groups(workspace.groups));
    let store = snapshot.store.as_ref();
    let resolver_config: ResolverConfig = config.resolver_config();

    let output = match args.command {
        Command::Pins { path } => query::pins(store, &path),
        Command::Ancestors { namespace, class } => query::ancestors(store, &namespace, scope(class)),
        Command::Methods { namespace, class } => query::methods(store, &namespace, scope(class)),
        Command::Constants { namespace } => query::constants(store, &namespace),
        Command::Resolve { name, gates } => {
            let gates: Vec<SmolStr> = gates.iter().map(SmolStr::new).collect();
            query::resolve(store, &name, &gates)
        }
        Command::Call {
            receiver,
            method,
            args,
            block_symbol,
        } => {
            let receiver = ComplexType::try_parse(&receiver).into_diagnostic()?;
            let args = args
                .iter()
                .map(|arg| ComplexType::try_parse(arg))
                .collect::<Result<Vec<_>, _>>()
                .into_diagnostic()?;
            let resolver = Resolver::new(store, &resolver_config);
            query::call(&resolver, receiver, &method, args, block_symbol.as_deref())
        }
    };
    println!("{output}");
    Ok(())
}
