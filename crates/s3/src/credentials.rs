//! Credential profiles
//!
//! Reads a named profile from an AWS-style credentials file. Only the file
//! given is consulted; environment variables and instance metadata are not.

use std::path::Path;

use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use bkt_core::{Error, Result};

/// Resolve `profile` from `credentials_file`
///
/// Fails with [`Error::Auth`] when the file, the profile or its keys are
/// missing.
pub async fn resolve_profile(credentials_file: &Path, profile: &str) -> Result<Credentials> {
    if !credentials_file.is_file() {
        return Err(Error::Auth(format!(
            "Credentials file not found: {}",
            credentials_file.display()
        )));
    }

    let files = ProfileFiles::builder()
        .with_file(ProfileFileKind::Credentials, credentials_file)
        .build();

    let provider = ProfileFileCredentialsProvider::builder()
        .profile_files(files)
        .profile_name(profile)
        .build();

    let credentials = provider.provide_credentials().await.map_err(|e| {
        Error::Auth(format!(
            "Cannot load profile '{profile}' from {}: {e}",
            credentials_file.display()
        ))
    })?;

    tracing::debug!(profile, file = %credentials_file.display(), "Resolved credentials");
    Ok(credentials)
}
