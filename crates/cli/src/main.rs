use std::process::ExitCode;

fn main() -> ExitCode {
    fitsize_cli::run()
}
