#![forbid(unsafe_code)]

fn main() {
    std::process::exit(chamado_log_cli::run());
}
