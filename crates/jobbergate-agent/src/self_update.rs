//! Keep the agent's version in step with the API.

use jobbergate_parsers::run_command;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::AgentError;
use crate::ports::SubmissionApi;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

/// Upgrades download and build, so they get far longer than SLURM calls.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Parse `major.minor[.patch]`, ignoring any pre-release or build suffix.
    pub fn parse(s: &str) -> Result<Self, AgentError> {
        let caps = VERSION_RE
            .captures(s.trim())
            .ok_or_else(|| AgentError::Version(s.to_string()))?;
        let number = |i: usize| -> Result<u64, AgentError> {
            caps.get(i)
                .map_or(Ok(0), |m| m.as_str().parse())
                .map_err(|_| AgentError::Version(s.to_string()))
        };
        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// How far apart two versions are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    Patch,
    Minor,
    Major,
}

impl Severity {
    pub fn between(installed: Version, advertised: Version) -> Self {
        if installed.major != advertised.major {
            Self::Major
        } else if installed.minor != advertised.minor {
            Self::Minor
        } else if installed.patch != advertised.patch {
            Self::Patch
        } else {
            Self::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCheck {
    /// Already running the advertised version
    Current,
    /// Major versions differ; left for an operator
    Skipped(Version),
    /// Same major version, but different; install it
    Available(Version),
}

/// Compare the installed version with the one the API advertises.
pub async fn check_version<A>(api: &A, installed: &str) -> Result<UpdateCheck, AgentError>
where
    A: SubmissionApi + ?Sized,
{
    let installed = Version::parse(installed)?;
    let advertised = Version::parse(&api.api_version().await?)?;

    match Severity::between(installed, advertised) {
        Severity::None => {
            tracing::debug!("agent version {} is current", installed);
            Ok(UpdateCheck::Current)
        }
        Severity::Major => {
            tracing::warn!(
                "API runs {} but the agent is {}; major upgrades need an operator",
                advertised,
                installed
            );
            Ok(UpdateCheck::Skipped(advertised))
        }
        severity => {
            tracing::info!(
                "{:?} version change {} -> {} available",
                severity,
                installed,
                advertised
            );
            Ok(UpdateCheck::Available(advertised))
        }
    }
}

/// Install `version`.
///
/// `upgrade_command` runs through `sh -c` with `{version}` replaced.
pub async fn upgrade(upgrade_command: &str, version: Version) -> Result<(), AgentError> {
    let script = upgrade_command.replace("{version}", &version.to_string());
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&script);
    let output = run_command(&mut cmd, "upgrade", UPGRADE_TIMEOUT)
        .await
        .map_err(|e| AgentError::Upgrade(e.to_string()))?;
    if !output.trim().is_empty() {
        tracing::debug!("upgrade output: {}", output.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn api(version: &str) -> FakeApi {
        FakeApi {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            v("4.2.1"),
            Version {
                major: 4,
                minor: 2,
                patch: 1
            }
        );
        assert_eq!(v("v5.0"), v("5.0.0"));
        assert_eq!(v("5.1.0a3"), v("5.1.0"));
        assert_eq!(v("5.1.0-rc.1+build"), v("5.1.0"));
        assert!(Version::parse("latest").is_err());
        assert!(Version::parse("5").is_err());
    }

    #[test]
    fn test_severity() {
        assert_eq!(Severity::between(v("1.2.3"), v("1.2.3")), Severity::None);
        assert_eq!(Severity::between(v("1.2.3"), v("1.2.4")), Severity::Patch);
        assert_eq!(Severity::between(v("1.2.3"), v("1.3.0")), Severity::Minor);
        assert_eq!(Severity::between(v("1.2.3"), v("1.1.9")), Severity::Minor);
        assert_eq!(Severity::between(v("1.2.3"), v("2.0.0")), Severity::Major);
    }

    #[tokio::test]
    async fn test_current_version() {
        let check = check_version(&api("1.2.3"), "1.2.3").await.unwrap();
        assert_eq!(check, UpdateCheck::Current);
    }

    #[tokio::test]
    async fn test_major_change_is_skipped() {
        let check = check_version(&api("2.0.0"), "1.2.3").await.unwrap();
        assert_eq!(check, UpdateCheck::Skipped(v("2.0.0")));
    }

    #[tokio::test]
    async fn test_minor_and_patch_changes_are_available() {
        let check = check_version(&api("1.3.0"), "1.2.3").await.unwrap();
        assert_eq!(check, UpdateCheck::Available(v("1.3.0")));
        let check = check_version(&api("1.2.2"), "1.2.3").await.unwrap();
        assert_eq!(check, UpdateCheck::Available(v("1.2.2")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upgrade_substitutes_version() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("installed");
        let command = format!("echo {{version}} > {}", marker.display());

        upgrade(&command, v("1.3.0")).await.unwrap();
        assert_eq!(std::fs::read_to_string(marker).unwrap().trim(), "1.3.0");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_upgrade_is_an_error() {
        match upgrade("echo nope >&2; exit 3", v("1.2.4")).await {
            Err(AgentError::Upgrade(message)) => assert!(message.contains("nope")),
            other => panic!("expected upgrade error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_error() {
        let api = FakeApi::default();
        assert!(check_version(&api, "1.2.3").await.is_err());
    }
}
