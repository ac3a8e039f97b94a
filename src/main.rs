use clap::{Arg, Command};
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    let matches = Command::new("mint")
        .about("A minimal dynamically-typed scripting language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .required(true)
                .index(1),
        )
        .get_matches();

    let Some(file_path) = matches.get_one::<String>("file") else {
        process::exit(2);
    };
    run_file(file_path);
}

fn run_file(path: &str) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            if mint::run(&source, Some(&filename)).is_err() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
