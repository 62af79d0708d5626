use clap::{crate_authors, crate_name, crate_version, App, AppSettings};

use requal::cli;
use requal::core::pipeline::PipelineStatus;

fn main() {
    let matches = App::new(crate_name!())
        .author(crate_authors!("\n"))
        .version(crate_version!())
        .max_term_width(120)
        .setting(AppSettings::DeriveDisplayOrder)
        .args(cli::args::all())
        .get_matches();

    let code = match cli::App::new(&matches).run() {
        Ok(PipelineStatus::Complete) => 0,
        Ok(PipelineStatus::Cancelled) => 4,
        Err(error) => {
            eprintln!("{}", error);
            error.exit_code()
        }
    };
    std::process::exit(code);
}
