use std::{path::Path, process::ExitCode};

use loadstone::metadata::MetadataDocument;

fn print_usage() {
    eprintln!("Usage: metadata-validator <metadata file path>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -h, --help     Print usage information.");
    eprintln!("  -v, --version  Print the version number.");
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [arg] if arg == "-v" || arg == "--version" => {
            println!("metadata-validator {}", loadstone::loadstone_version());
            ExitCode::SUCCESS
        }
        [arg] if arg == "-h" || arg == "--help" => {
            print_usage();
            ExitCode::FAILURE
        }
        [path] => validate(Path::new(path)),
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    println!("Validating metadata file: {}", path.display());

    let mut document = MetadataDocument::default();
    match document.load(path) {
        Ok(()) => {
            println!("SUCCESS!");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprint!("FAILURE! {error}");

            let mut source = std::error::Error::source(&error);
            while let Some(error) = source {
                eprint!(": {error}");
                source = error.source();
            }
            eprintln!();

            ExitCode::FAILURE
        }
    }
}
