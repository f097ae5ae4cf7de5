//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - Remote quantum job submission",
        style("qrest").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qrest-hal                Backend contract and job lifecycle");
    println!("  qrest-adapter-fermioniq  Fermioniq emulator backend");
    println!("  qrest-cli                Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
