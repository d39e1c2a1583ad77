fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match forum_setup::options::CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("forum-setup: {}", e);
            eprintln!("{}", forum_setup::options::USAGE);
            std::process::exit(forum_setup::EXIT_USAGE);
        }
    };

    if cli.help {
        println!("{}", forum_setup::options::USAGE);
        return;
    }

    // Non-interactive pipeline proof mode.
    // Writes `setup_smoke_transcript.log` under the log folder and exits 0/1.
    if cli.setup_smoke {
        std::process::exit(forum_setup::run_setup_smoke(&cli));
    }

    std::process::exit(forum_setup::run_setup(&cli));
}
