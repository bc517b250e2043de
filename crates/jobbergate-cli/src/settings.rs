//! Validated agent settings.

use crate::{Args, MapperKind};
use camino::Utf8PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("single-user mapper needs --single-user-submitter or $USER")]
    MissingSubmitter,
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("upgrade command must not be empty")]
    EmptyUpgradeCommand,
}

/// Resolved mapping from job owners to local accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMapping {
    SingleUser(String),
    EmailLocalPart,
}

/// Everything the agent needs, checked and with units attached.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_api_url: String,
    pub oidc_base_url: String,
    pub oidc_client_id: String,
    pub oidc_client_secret: String,
    pub oidc_audience: String,
    pub cache_dir: Option<Utf8PathBuf>,
    pub sbatch_path: Utf8PathBuf,
    pub scontrol_path: Utf8PathBuf,
    pub sacct_path: Utf8PathBuf,
    pub default_slurm_work_dir: Utf8PathBuf,
    pub user_mapping: UserMapping,
    pub jobs_interval: Duration,
    pub cluster_status_interval: Duration,
    pub self_update_interval: Option<Duration>,
    pub upgrade_command: String,
    pub page_size: u64,
    pub command_timeout: Duration,
    pub http_timeout: Duration,
    pub once: bool,
}

impl Settings {
    /// Validate parsed arguments.
    ///
    /// `user` and `home` stand in for `$USER` and `$HOME`.
    pub fn from_args(
        args: Args,
        user: Option<String>,
        home: Option<Utf8PathBuf>,
    ) -> Result<Self, SettingsError> {
        let seconds = |value: u64, name: &'static str| {
            if value == 0 {
                Err(SettingsError::NotPositive(name))
            } else {
                Ok(Duration::from_secs(value))
            }
        };

        let user_mapping = match args.user_mapper {
            MapperKind::SingleUser => UserMapping::SingleUser(
                args.single_user_submitter
                    .or(user)
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(SettingsError::MissingSubmitter)?,
            ),
            MapperKind::EmailLocalPart => UserMapping::EmailLocalPart,
        };

        if args.page_size == 0 {
            return Err(SettingsError::NotPositive("page-size"));
        }
        if args.upgrade_command.trim().is_empty() {
            return Err(SettingsError::EmptyUpgradeCommand);
        }

        let cache_dir = args
            .cache_dir
            .or_else(|| home.map(|h| h.join(".cache").join("jobbergate-agent")));

        Ok(Self {
            base_api_url: args.base_api_url,
            oidc_base_url: args.oidc_base_url,
            oidc_client_id: args.oidc_client_id,
            oidc_client_secret: args.oidc_client_secret,
            oidc_audience: args.oidc_audience,
            cache_dir,
            sbatch_path: args.sbatch_path,
            scontrol_path: args.scontrol_path,
            sacct_path: args.sacct_path,
            default_slurm_work_dir: args.default_slurm_work_dir,
            user_mapping,
            jobs_interval: seconds(args.jobs_interval, "jobs-interval")?,
            cluster_status_interval: seconds(
                args.cluster_status_interval,
                "cluster-status-interval",
            )?,
            self_update_interval: args
                .self_update_interval
                .map(|s| seconds(s, "self-update-interval"))
                .transpose()?,
            upgrade_command: args.upgrade_command,
            page_size: args.page_size,
            command_timeout: seconds(args.command_timeout, "command-timeout")?,
            http_timeout: seconds(args.http_timeout, "http-timeout")?,
            once: args.once,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "jobbergate-agent",
            "--oidc-base-url",
            "https://auth.example.org",
            "--oidc-client-id",
            "agent",
            "--oidc-client-secret",
            "secret",
        ];
        argv.extend(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_single_user_falls_back_to_current_user() {
        let settings = Settings::from_args(args(&[]), Some("slurm".into()), None).unwrap();
        assert_eq!(settings.user_mapping, UserMapping::SingleUser("slurm".into()));
        assert!(settings.cache_dir.is_none());
    }

    #[test]
    fn test_explicit_submitter_wins() {
        let settings = Settings::from_args(
            args(&["--single-user-submitter", "ubuntu"]),
            Some("root".into()),
            None,
        )
        .unwrap();
        assert_eq!(settings.user_mapping, UserMapping::SingleUser("ubuntu".into()));
    }

    #[test]
    fn test_single_user_without_any_user_fails() {
        let err = Settings::from_args(args(&[]), None, None).unwrap_err();
        assert_eq!(err, SettingsError::MissingSubmitter);
    }

    #[test]
    fn test_email_mapper_needs_no_user() {
        let settings =
            Settings::from_args(args(&["--user-mapper", "email-local-part"]), None, None).unwrap();
        assert_eq!(settings.user_mapping, UserMapping::EmailLocalPart);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err =
            Settings::from_args(args(&["--jobs-interval", "0"]), Some("u".into()), None).unwrap_err();
        assert_eq!(err, SettingsError::NotPositive("jobs-interval"));
    }

    #[test]
    fn test_cache_dir_defaults_under_home() {
        let settings = Settings::from_args(
            args(&[]),
            Some("u".into()),
            Some(Utf8PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(
            settings.cache_dir,
            Some(Utf8PathBuf::from("/home/u/.cache/jobbergate-agent"))
        );
        assert_eq!(settings.jobs_interval, Duration::from_secs(60));
    }
}
