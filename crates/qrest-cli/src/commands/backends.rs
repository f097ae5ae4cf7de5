//! Backends command implementation.

use console::style;

use super::common::create_registry;

/// Execute the backends command.
pub fn execute() {
    let registry = create_registry();
    println!("{} Available backends:\n", style("qrest").cyan().bold());

    for name in registry.available_backends() {
        println!("  {} {}", style("●").green(), style(name).bold());
    }

    println!(
        "\n  Configure a backend with {} or {}.",
        style("--config <file.yaml>").dim(),
        style("--set KEY=VALUE").dim()
    );
}
