use std::process::ExitCode;

fn main() -> ExitCode {
    lockstep::cli::parse_args()
}
