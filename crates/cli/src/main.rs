use std::process::ExitCode;

fn main() -> ExitCode {
    pdsdesk_cli::run()
}
