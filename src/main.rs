use std::io;
use std::process;
use std::time::Instant;

use env_logger::Target;
use failure::{Error, ResultExt};
use log::{error, info, LevelFilter};
use structopt::StructOpt;

use migrator::cli::{self, CliInputs, Config};
use migrator::fasit::{self, FasitClient};
use migrator::{document, mapper};

fn init_logging(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).target(Target::Stderr);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

#[tokio::main(basic_scheduler)]
pub async fn main() {
    let args = CliInputs::from_args();
    init_logging(cli::verbosity_level(&args));
    let config = Config::from(args);

    if let Err(err) = run(&config).await {
        let chain: Vec<String> = err.iter_chain().map(|cause| cause.to_string()).collect();
        error!("{}", chain.join(": "));
        process::exit(1);
    }
}

async fn run(config: &Config) -> Result<(), Error> {
    let deploy = &config.deploy;

    info!("Reading NAIS manifest...");
    let manifest = document::read_manifest(&config.input)?;
    info!("Finished reading NAIS manifest");

    let resources = if deploy.fasit_enabled() {
        info!(
            "Fasit integration enabled, retrieving resources for application '{}' environment '{}' zone '{}'",
            deploy.application, deploy.environment, deploy.zone
        );

        let client = FasitClient::new(&config.fasit_url, &deploy.fasit_username, &deploy.fasit_password);
        let timer = Instant::now();
        let resources = fasit::fetch_resources(
            &client,
            &deploy.application,
            &deploy.environment,
            deploy.zone,
            &manifest.fasit_resources.used,
        )
        .await
        .context("fetch fasit resources")?;

        info!("Retrieved {} Fasit resources in {:?}", resources.len(), timer.elapsed());
        resources
    } else {
        Vec::new()
    };

    let application = mapper::convert(&manifest, deploy, &resources);

    info!("Conversion successful! Here is your Naiserator file:");
    let stdout = io::stdout();
    document::write_application(stdout.lock(), &application)?;
    Ok(())
}
