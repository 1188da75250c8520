use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Credentials and address of the controller whose configuration is being
/// watched.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Publish target: the local working copy and the credentials for its
/// remote.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub username: String,
    pub password: String,
    pub repo_dir: PathBuf,
    pub branch: String,
}

/// Operator notification settings.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub from: String,
    pub to: String,
    pub password: String,
    pub smtp_relay: String,
}

/// The single validated settings object the pipeline receives. Immutable
/// for the lifetime of the process; the loop's mutable state lives
/// elsewhere.
#[derive(Debug, Clone)]
pub struct Settings {
    pub controller: ControllerSettings,
    /// Path of the controller's persisted configuration store, watched for
    /// fingerprint changes.
    pub store_path: PathBuf,
    /// Path of the controller's own log file, read by the audit extractor.
    pub controller_log: PathBuf,
    /// Snapshot filename inside the working copy.
    pub snapshot_file: String,
    /// Audit trail filename inside the working copy.
    pub trail_file: String,
    pub interval: Duration,
    pub audit_enabled: bool,
    pub publish: Option<PublishSettings>,
    pub notify: Option<NotifySettings>,
}

impl Settings {
    /// Startup validation. Enabled option groups must be complete; a failure
    /// here is fatal before the loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.username.is_empty() || self.controller.password.is_empty() {
            return Err(ConfigError::MissingCredentials(
                "controller username and password are required".to_string(),
            ));
        }

        if let Some(publish) = &self.publish {
            if publish.username.is_empty() || publish.password.is_empty() {
                return Err(ConfigError::MissingCredentials(
                    "publish is enabled but git username/password are not set".to_string(),
                ));
            }
        }

        if let Some(notify) = &self.notify {
            if notify.from.is_empty() || notify.to.is_empty() || notify.password.is_empty() {
                return Err(ConfigError::MissingCredentials(
                    "email is enabled but from/to/password are not all set".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Where the snapshot lands inside the working copy (or next to the
    /// store file when publishing is disabled).
    pub fn snapshot_path(&self) -> PathBuf {
        self.artifact_dir().join(&self.snapshot_file)
    }

    pub fn trail_path(&self) -> PathBuf {
        self.artifact_dir().join(&self.trail_file)
    }

    fn artifact_dir(&self) -> PathBuf {
        match &self.publish {
            Some(publish) => publish.repo_dir.clone(),
            None => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            controller: ControllerSettings {
                host: "localhost".to_string(),
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
            store_path: PathBuf::from("/opt/controller/db/config.json"),
            controller_log: PathBuf::from("/log/controller/controller.log"),
            snapshot_file: "configuration.txt".to_string(),
            trail_file: "userslog.txt".to_string(),
            interval: Duration::from_secs(1),
            audit_enabled: true,
            publish: None,
            notify: None,
        }
    }

    #[test]
    fn test_controller_credentials_required() {
        let mut settings = base_settings();
        settings.controller.password = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_publish_requires_git_credentials() {
        let mut settings = base_settings();
        settings.publish = Some(PublishSettings {
            username: String::new(),
            password: "token".to_string(),
            repo_dir: PathBuf::from("configuration-control-scripts"),
            branch: "master".to_string(),
        });
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_notify_requires_complete_addresses() {
        let mut settings = base_settings();
        settings.notify = Some(NotifySettings {
            from: "ops@example.com".to_string(),
            to: String::new(),
            password: "secret".to_string(),
            smtp_relay: "smtp.gmail.com".to_string(),
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_minimal_settings_validate() {
        assert!(base_settings().validate().is_ok());
    }

    #[test]
    fn test_artifacts_land_in_repo_when_publishing() {
        let mut settings = base_settings();
        settings.publish = Some(PublishSettings {
            username: "gituser".to_string(),
            password: "gitpass".to_string(),
            repo_dir: PathBuf::from("configuration-control-scripts"),
            branch: "master".to_string(),
        });

        assert_eq!(
            settings.snapshot_path(),
            PathBuf::from("configuration-control-scripts/configuration.txt")
        );
    }
}
