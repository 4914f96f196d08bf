use std::process::ExitCode;

fn main() -> ExitCode {
    blue_cli::trace::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = blue_cli::driver::run(&args);
    ExitCode::from(code as u8)
}
