// uvcargo - main entry point
use std::io::IsTerminal;
use std::process;
use uvcargo::cli::Cli;

fn main() {
    let cli = Cli::parse_forwarded(std::env::args_os());

    let exit_code = match cli.run() {
        Ok(code) => code,
        Err(e) => {
            let use_colors = std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err();
            eprintln!("{}", e.user_message(use_colors));
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
