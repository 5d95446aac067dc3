#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use std::error::Error;

use clap::{crate_version, App, Arg};
use slog::Logger;

use adapter::{AdapterTypes, DummyAdapter, EthereumAdapter};
use primitives::{
    adapter::{Adapter, DummyAdapterOptions, KeystoreOptions},
    config::{configuration, Config},
    util::{tests::prep_db::AUTH, ApiUrl},
};
use validator_worker::Worker;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = App::new("Validator worker")
        .version(crate_version!())
        .arg(
            Arg::with_name("config")
                .help("the config file for the validator worker")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("adapter")
                .long("adapter")
                .short("a")
                .help("the adapter for authentication and signing")
                .required(true)
                .default_value("ethereum")
                .possible_values(&["ethereum", "dummy"])
                .takes_value(true),
        )
        .arg(
            Arg::with_name("keystoreFile")
                .long("keystoreFile")
                .short("k")
                .help("path to the JSON Ethereum Keystore file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("dummyIdentity")
                .long("dummyIdentity")
                .short("i")
                .help("the identity to use with the dummy adapter")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("sentryUrl")
                .long("sentryUrl")
                .short("u")
                .help("the URL to the sentry used for listing channels")
                .default_value("http://127.0.0.1:8005")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("singleTick")
                .long("singleTick")
                .short("t")
                .takes_value(false)
                .help("runs the validator in single-tick mode and exits"),
        )
        .get_matches();

    let environment = std::env::var("ENV").unwrap_or_else(|_| "development".into());
    let config = configuration(&environment, cli.value_of("config"))?;
    let sentry_url: ApiUrl = cli
        .value_of("sentryUrl")
        .expect("sentry url is missing")
        .parse()?;
    let is_single_tick = cli.is_present("singleTick");

    let adapter = match cli.value_of("adapter").expect("adapter is missing") {
        "ethereum" => {
            let keystore_file = cli
                .value_of("keystoreFile")
                .ok_or("keystoreFile is required for the ethereum adapter")?;
            let keystore_pwd = std::env::var("KEYSTORE_PWD")
                .map_err(|_| "KEYSTORE_PWD environment variable is missing")?;

            let keystore_options = KeystoreOptions {
                keystore_file: keystore_file.to_string(),
                keystore_pwd,
            };

            AdapterTypes::EthereumAdapter(Box::new(EthereumAdapter::init(
                keystore_options,
                &config,
            )?))
        }
        "dummy" => {
            let dummy_identity = cli
                .value_of("dummyIdentity")
                .ok_or("dummyIdentity is required for the dummy adapter")?;

            let options = DummyAdapterOptions {
                dummy_identity: dummy_identity.into(),
                dummy_auth_tokens: AUTH.clone(),
            };

            AdapterTypes::DummyAdapter(Box::new(DummyAdapter::init(options, &config)?))
        }
        _ => unreachable!("clap restricts the adapter values"),
    };

    let logger = logger();

    match adapter {
        AdapterTypes::EthereumAdapter(ethereum_adapter) => run(
            is_single_tick,
            sentry_url,
            &config,
            *ethereum_adapter,
            &logger,
        ),
        AdapterTypes::DummyAdapter(dummy_adapter) => {
            run(is_single_tick, sentry_url, &config, *dummy_adapter, &logger)
        }
    }
}

fn run<A: Adapter + 'static>(
    is_single_tick: bool,
    sentry_url: ApiUrl,
    config: &Config,
    mut adapter: A,
    logger: &Logger,
) -> Result<(), Box<dyn Error>> {
    // an adapter which cannot unlock is fatal
    adapter.unlock()?;

    let worker = Worker::new(adapter, config.clone(), logger.clone(), sentry_url);

    worker.run(is_single_tick)
}

fn logger() -> Logger {
    use primitives::util::logging::{Async, PrefixedCompactFormat, TermDecorator};
    use slog::{o, Drain};

    let decorator = TermDecorator::new().build();
    let drain = PrefixedCompactFormat::new("validator_worker", decorator).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}
