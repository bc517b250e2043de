//! Map job owners to local accounts.

use jobbergate_cli::UserMapping;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MappingError {
    #[error("cannot derive a local user from {0:?}")]
    InvalidEmail(String),
}

/// Local account a submission owned by `email` runs as.
pub fn local_username(mapping: &UserMapping, email: &str) -> Result<String, MappingError> {
    match mapping {
        UserMapping::SingleUser(user) => Ok(user.clone()),
        UserMapping::EmailLocalPart => {
            let local = email
                .split_once('@')
                .map(|(local, _)| local.trim())
                .filter(|local| is_valid_username(local))
                .ok_or_else(|| MappingError::InvalidEmail(email.to_string()))?;
            Ok(local.to_string())
        }
    }
}

/// POSIX portable user names, no leading dash.
fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
