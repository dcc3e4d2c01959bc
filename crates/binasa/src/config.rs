//! Resolution of the runtime `DashboardConfig` from the config file,
//! the selected profile and CLI flag overrides.

use std::time::Duration;

use binasa_config::{Config, Profile};
use binasa_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Name of the profile the flags select, without requiring it to exist.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated, sorted profile names for help text.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Build a `DashboardConfig` from the config file, profile and flags.
pub fn resolve_dashboard_config(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let cfg = binasa_config::load_config()?;
    resolve_with(global, &cfg)
}

pub(crate) fn resolve_with(global: &GlobalOpts, cfg: &Config) -> Result<DashboardConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let stored = cfg.profiles.get(&profile_name);

    // --device works with or without a stored profile; profile tuning still applies.
    let profile = match (&global.device, stored) {
        (Some(device), Some(p)) => Profile {
            device: device.clone(),
            ..p.clone()
        },
        (Some(device), None) => Profile {
            device: device.clone(),
            ..Profile::default()
        },
        (None, Some(p)) => p.clone(),
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: binasa_config::config_path().display().to_string(),
            });
        }
    };

    let mut config = binasa_config::profile_to_dashboard_config(&profile, &cfg.defaults)?;

    if global.insecure {
        config.accept_invalid_certs = true;
    }
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.timeout = Duration::from_secs(secs);
    }
    if global.no_push {
        config.push_enabled = false;
    }

    config.validate()?;
    tracing::debug!(
        profile = %profile_name,
        device = %config.url,
        push = config.push_enabled,
        "resolved dashboard config"
    );
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["binasa"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), profile);
        cfg
    }

    #[test]
    fn device_flag_needs_no_profile() {
        let resolved =
            resolve_with(&global(&["--device", "http://192.168.4.1"]), &Config::default())
                .unwrap();
        assert_eq!(resolved.url.as_str(), "http://192.168.4.1/");
        assert!(resolved.push_enabled);
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with(
            "default",
            Profile {
                device: "http://10.0.0.5".into(),
                poll_interval_ms: Some(500),
                ..Profile::default()
            },
        );
        let resolved = resolve_with(&global(&["--no-push", "--timeout", "3"]), &cfg).unwrap();
        assert_eq!(resolved.url.as_str(), "http://10.0.0.5/");
        assert_eq!(resolved.poll_interval, Duration::from_millis(500));
        assert_eq!(resolved.timeout, Duration::from_secs(3));
        assert!(!resolved.push_enabled);
    }

    #[test]
    fn missing_named_profile_lists_available() {
        let cfg = config_with(
            "tank",
            Profile {
                device: "http://10.0.0.5".into(),
                ..Profile::default()
            },
        );
        let err = resolve_with(&global(&["--profile", "garage"]), &cfg).unwrap_err();
        assert!(
            matches!(err, CliError::ProfileNotFound { ref name, ref available } if name == "garage" && available == "tank"),
            "got {err:?}"
        );
    }

    #[test]
    fn nothing_configured_points_at_config_init() {
        let err = resolve_with(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }), "got {err:?}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = resolve_with(
            &global(&["--device", "http://192.168.4.1", "--timeout", "0"]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "timeout"));
    }
}
