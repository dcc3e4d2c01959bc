//! Config subcommand handlers.

use std::io::{self, IsTerminal};

use binasa_config::{Config, Profile};
use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{active_profile_name, available_profiles};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// TOML-style rendering of the effective config.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "insecure = {}", d.insecure);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "push = {}", d.push);
    let _ = writeln!(out, "poll_interval_ms = {}", d.poll_interval_ms);
    let _ = writeln!(out, "resync_delay_ms = {}", d.resync_delay_ms);
    let _ = writeln!(out, "reconnect_delay_ms = {}", d.reconnect_delay_ms);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "device = \"{}\"", p.device);
        if let Some(ref url) = p.push_url {
            let _ = writeln!(out, "push_url = \"{url}\"");
        }
        if let Some(port) = p.push_port {
            let _ = writeln!(out, "push_port = {port}");
        }
        if let Some(push) = p.push {
            let _ = writeln!(out, "push = {push}");
        }
        if let Some(ref path) = p.control_path {
            let _ = writeln!(out, "control_path = \"{path}\"");
        }
        for (key, value) in [
            ("poll_interval_ms", p.poll_interval_ms),
            ("resync_delay_ms", p.resync_delay_ms),
            ("reconnect_delay_ms", p.reconnect_delay_ms),
            ("reconnect_max_delay_ms", p.reconnect_max_delay_ms),
            ("timeout", p.timeout),
        ] {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = {v}");
            }
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn check_device_url(raw: &str) -> Result<String, CliError> {
    let raw = raw.trim();
    let url: url::Url = raw.parse().map_err(|e| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: format!("expected http:// or https://, got '{}'", url.scheme()),
        });
    }
    Ok(raw.to_owned())
}

fn prompt_device_url() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: "pass --url when not running interactively".into(),
        });
    }
    Input::new()
        .with_prompt("Device URL")
        .default("http://192.168.4.1".into())
        .interact_text()
        .map_err(prompt_err)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { url, set_default } => {
            let mut cfg = binasa_config::load_config()?;
            let name = global.profile.clone().unwrap_or_else(|| "default".into());

            let raw = match url.or_else(|| global.device.clone()) {
                Some(raw) => raw,
                None => prompt_device_url()?,
            };
            let device = check_device_url(&raw)?;

            let had_profiles = !cfg.profiles.is_empty();
            cfg.profiles
                .entry(name.clone())
                .and_modify(|p| p.device.clone_from(&device))
                .or_insert_with(|| Profile {
                    device,
                    ..Profile::default()
                });
            if set_default || !had_profiles {
                cfg.default_profile = Some(name.clone());
            }

            let path = binasa_config::save_config(&cfg)?;
            tracing::info!(profile = %name, path = %path.display(), "config saved");
            if !global.quiet {
                eprintln!("Saved profile '{name}' to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = binasa_config::load_config()?;
            let out = output::render_single(global.output, &cfg, format_config, format_config)?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &binasa_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = binasa_config::load_config()?;
            let active = active_profile_name(global, &cfg);
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => names
                    .iter()
                    .map(|n| {
                        let marker = if **n == active { "*" } else { " " };
                        format!("{marker} {n}\t{}", cfg.profiles[*n].device)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                structured => output::render_single(structured, &names, |_| String::new(), |_| {
                    String::new()
                })?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = binasa_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            binasa_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile is now '{name}'");
            }
            Ok(())
        }
    }
}
