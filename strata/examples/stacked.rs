//! A small stacked CLI.
//!
//! ```text
//! cargo run --example stacked -- status
//! cargo run --example stacked -- -vv users add alice --admin
//! cargo run --example stacked -- users
//! ```

use strata::{
    init_subscriber_with_config, ArgSpec, CommandSpec, Controller, ControllerMeta,
    ControllerSpec, Engine, EngineConfig, Invocation, TracingConfig,
};

#[derive(ControllerMeta)]
#[strata(label = "base", help = "stacked controller demo")]
struct Base;

impl Controller<String> for Base {
    fn spec(&self) -> ControllerSpec {
        Self::controller_spec().arg(
            ArgSpec::new(["-v", "--verbose"])
                .action(strata::ArgAction::Count)
                .help("increase log verbosity"),
        )
    }

    fn commands(&self) -> Vec<CommandSpec<String>> {
        vec![CommandSpec::new("status", |_: &Invocation| "all systems go".to_string())
            .help("show application status")]
    }
}

#[derive(ControllerMeta)]
#[strata(stacked_type = "nested", help = "manage users", alias = "u", default_command = "list")]
struct Users;

impl Controller<String> for Users {
    fn spec(&self) -> ControllerSpec {
        Self::controller_spec()
    }

    fn commands(&self) -> Vec<CommandSpec<String>> {
        vec![
            CommandSpec::new("list", |_: &Invocation| "alice\nbob".to_string()).help("list users"),
            CommandSpec::new("add", |inv: &Invocation| {
                let name = inv.get_str("name").unwrap_or_default();
                if inv.flag("admin") {
                    format!("added {name} (admin)")
                } else {
                    format!("added {name}")
                }
            })
            .help("add a user")
            .arg(ArgSpec::positional("name").help("user name"))
            .arg(ArgSpec::new(["--admin"]).store_true()),
        ]
    }
}

fn main() {
    let engine = Engine::<String>::builder(EngineConfig::new("stacked").version(env!("CARGO_PKG_VERSION")))
        .register(Base)
        .and_then(|b| b.register(Users))
        .and_then(|b| b.setup());

    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let verbosity = engine
        .parse(std::env::args_os().skip(1))
        .map(|inv| inv.count("verbose"))
        .unwrap_or(0);
    init_subscriber_with_config(TracingConfig::from_verbosity(verbosity));

    match engine.dispatch_env() {
        Ok(output) => println!("{output}"),
        Err(strata::Error::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
