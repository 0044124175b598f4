use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod io;
mod output;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() {
    let cli = args::Cli::parse();
    init_logging(cli.json);
    output::init(cli.json);

    if let Err(e) = cmd::dispatch(cli) {
        output::eprintln_line(&format!("error: {e:#}"));
        std::process::exit(1);
    }
}
