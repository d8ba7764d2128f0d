use blogit::build::build_site;
use blogit::config::{Config, DEFAULT_ENVIRONMENT};
use clap::{App, Arg};
use std::path::Path;
use std::process::exit;

fn main() {
    env_logger::init();

    let matches = App::new("blogit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from date-named markdown posts")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("The configuration file (default: search for blogit.yaml upwards)"),
        )
        .arg(
            Arg::with_name("env")
                .short("e")
                .long("env")
                .value_name("NAME")
                .takes_value(true)
                .default_value(DEFAULT_ENVIRONMENT)
                .help("The configuration environment to apply over `default`"),
        )
        .arg(
            Arg::with_name("passes")
                .long("passes")
                .value_name("N")
                .takes_value(true)
                .default_value("1")
                .help("Interpolation passes over the configuration"),
        )
        .get_matches();

    let environment = matches.value_of("env").unwrap_or(DEFAULT_ENVIRONMENT);
    let passes = match matches.value_of("passes").unwrap_or("1").parse::<usize>() {
        Ok(passes) => passes,
        Err(e) => {
            eprintln!("invalid --passes: {}", e);
            exit(1);
        }
    };

    let config = match matches.value_of("config") {
        Some(path) => Config::from_file(Path::new(path), environment, passes),
        None => match std::env::current_dir() {
            Ok(dir) => Config::from_directory(&dir, environment, passes),
            Err(e) => {
                eprintln!("reading current directory: {}", e);
                exit(1);
            }
        },
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    if let Err(e) = build_site(&config) {
        eprintln!("{}", e);
        exit(1);
    }
}
