use log::LevelFilter;
use structopt::{
    clap::AppSettings::{ColorAuto, ColoredHelp},
    StructOpt,
};

use crate::naisd::{Deploy, FasitEnvironment, Zone};

#[derive(Debug, StructOpt)]
#[structopt(setting(ColorAuto), setting(ColoredHelp), about)]
pub struct CliInputs {
    /// Verbosity level (-v, -vv, -vvv, etc.)
    /// Default (no `-v` flag(s)) => info.
    #[structopt(short, parse(from_occurrences))]
    pub verbosity_level: usize,

    /// Application name
    #[structopt(long, default_value = "myapplication")]
    pub application: String,

    /// Kubernetes namespace of the generated resource
    #[structopt(long, default_value = "default")]
    pub namespace: String,

    /// Zone (fss, sbs)
    #[structopt(long, default_value = "fss")]
    pub zone: Zone,

    /// Fasit url
    #[structopt(long, default_value = "http://localhost:8080")]
    pub fasit_url: String,

    /// Fasit username; leave blank to disable Fasit
    #[structopt(long, default_value = "")]
    pub fasit_username: String,

    /// Fasit password
    #[structopt(long, default_value = "")]
    pub fasit_password: String,

    /// Fasit environment ([pqtu][0-9]*)
    #[structopt(long, default_value = "p")]
    pub fasit_environment: FasitEnvironment,

    /// Input file, use '-' for STDIN
    #[structopt(long, default_value = "-")]
    pub input: String,
}

pub fn verbosity_level(args: &CliInputs) -> LevelFilter {
    match args.verbosity_level {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Everything a run needs, fixed once the arguments are parsed.
#[derive(Clone, Debug)]
pub struct Config {
    pub input: String,
    pub fasit_url: String,
    pub deploy: Deploy,
}

impl From<CliInputs> for Config {
    fn from(args: CliInputs) -> Config {
        Config {
            input: args.input,
            fasit_url: args.fasit_url,
            deploy: Deploy {
                application: args.application,
                namespace: args.namespace,
                zone: args.zone,
                environment: args.fasit_environment,
                fasit_username: args.fasit_username,
                fasit_password: args.fasit_password,
            },
        }
    }
}
