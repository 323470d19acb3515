//! `merkava` binary: argument parsing and command dispatch live in [`merkava::cli`].

fn main() {
    if let Err(e) = merkava::cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
