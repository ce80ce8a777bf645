use anyhow::Result;

use artisan_lib::platform::current_os_id;

use super::{load_config, parse_name, registry};
use crate::output::{OutputFormat, print_json, print_stat, symbols};

/// Show configuration, or the manifest of package `name`.
pub fn cmd_info(name: Option<&str>, output: OutputFormat) -> Result<()> {
  let config = load_config()?;

  let Some(name) = name else {
    if output.is_json() {
      return print_json(&serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "os": current_os_id(),
        "home": config.home(),
        "registry": config.registry_dir(),
        "keys": config.keys_dir(),
        "remote": config.remote,
      }));
    }
    println!("artisan v{}", env!("CARGO_PKG_VERSION"));
    print_stat("OS", current_os_id());
    print_stat("Home", &config.home().display().to_string());
    print_stat("Registry", &config.registry_dir().display().to_string());
    print_stat("Keys", &config.keys_dir().display().to_string());
    print_stat("Remote", config.remote.as_deref().unwrap_or("-"));
    print_stat("Wait timeout", &humantime::format_duration(config.wait.timeout()).to_string());
    return Ok(());
  };

  let registry = registry(&config);
  let name = parse_name(name)?;
  let entry = registry.find_by_name(&name)?;
  let seal = registry.get_seal(&entry)?;

  if output.is_json() {
    return print_json(&seal);
  }

  let m = &seal.manifest;
  println!("{name}");
  print_stat("Id", &entry.id);
  print_stat("Profile", &m.profile);
  print_stat("Type", &m.kind);
  print_stat("OS", &m.os);
  print_stat("Source", &m.source);
  print_stat("Commit", &m.commit);
  print_stat("Target", &m.target);
  print_stat("Size", &m.size);
  print_stat("Created", &m.time);
  print_stat("Digest", &seal.digest);
  print_stat("Signed", if seal.is_signed() { "yes" } else { "no" });
  if !m.functions.is_empty() {
    println!("Functions:");
    for f in &m.functions {
      match &f.description {
        Some(d) => println!("  {} {} {}", symbols::INFO, f.name, d),
        None => println!("  {} {}", symbols::INFO, f.name),
      }
    }
  }
  Ok(())
}
