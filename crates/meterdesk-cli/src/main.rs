#![forbid(unsafe_code)]

//! Entry point for the `meterdesk` binary.

#[tokio::main]
async fn main() {
    let exit_code = meterdesk_cli::run().await;
    std::process::exit(exit_code);
}
