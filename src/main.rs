mod args;
mod report;

use clap::Parser;
use log::{debug, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::report::config_reader::CommandLineOverrides;

fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    debug!("args: {:?}", args);

    let overrides = CommandLineOverrides {
        data_dir: args.data_dir.clone(),
        map: args.map.clone(),
        title: args.title.clone(),
        out: args.out.clone(),
    };

    let res = report::run_report(args.config.clone(), &overrides, args.reference.clone());

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        for cause in ErrorCompat::iter_chain(&e).skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
