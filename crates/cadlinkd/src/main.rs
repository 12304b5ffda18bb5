use std::process::ExitCode;

fn main() -> ExitCode {
    match cadlinkd::run_engine() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("cadlinkd: {error}");
            ExitCode::FAILURE
        }
    }
}
