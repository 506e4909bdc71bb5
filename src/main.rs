fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = manga_dl::cli::Args::parse();
    if let Err(e) = manga_dl::cli::run(&args) {
        eprintln!("{}", e);
        if args.info {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
