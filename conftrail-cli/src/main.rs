use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use conftrail_core::{ControllerSettings, NotifySettings, PublishSettings, Settings};
use conftrail_monitor::{Monitor, NoopNotifier, Notifier, SmtpNotifier};
use conftrail_session::SshClient;
use conftrail_sync::{SubprocessGit, Synchronizer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "conftrail")]
#[command(version, about = "Watch an SDN controller's configuration store and keep an audit trail of every change", long_about = None)]
struct Cli {
    /// Username for the controller
    username: String,

    /// Password for the controller
    password: String,

    /// Controller host to open the session against
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Path of the controller's persisted configuration store to watch
    #[arg(long, default_value = "/opt/controller/db/config.json")]
    store: PathBuf,

    /// Path of the controller log used for audit extraction
    #[arg(long, default_value = "/log/controller/controller.log")]
    controller_log: PathBuf,

    /// How often to poll the configuration store, in seconds
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Do not record who made the last configuration change
    #[arg(long)]
    no_audit: bool,

    /// Snapshot filename inside the working copy
    #[arg(long, default_value = "configuration.txt")]
    snapshot_file: String,

    /// Audit trail filename inside the working copy
    #[arg(long, default_value = "userslog.txt")]
    trail_file: String,

    /// Push each new snapshot to the version-control remote
    #[arg(short = 'g', long)]
    git: bool,

    /// Username for the version-control remote
    #[arg(long, default_value = "")]
    git_user: String,

    /// Password for the version-control remote
    #[arg(long, default_value = "")]
    git_password: String,

    /// Path of the local working copy
    #[arg(long, default_value = "configuration-control-scripts")]
    git_dir: PathBuf,

    /// Branch to push snapshots to
    #[arg(long, default_value = "master")]
    branch: String,

    /// Send a notification email when a change is published
    #[arg(short = 'e', long)]
    email: bool,

    /// Sender address (also the SMTP login)
    #[arg(long, default_value = "")]
    email_from: String,

    /// Recipient address
    #[arg(long, default_value = "")]
    email_to: String,

    /// Password for the sender's SMTP account
    #[arg(long, default_value = "")]
    email_password: String,

    /// SMTP relay host
    #[arg(long, default_value = "smtp.gmail.com")]
    smtp_relay: String,
}

impl Cli {
    fn into_settings(self) -> Settings {
        Settings {
            controller: ControllerSettings {
                host: self.host,
                username: self.username,
                password: self.password,
            },
            store_path: self.store,
            controller_log: self.controller_log,
            snapshot_file: self.snapshot_file,
            trail_file: self.trail_file,
            interval: Duration::from_secs(self.interval),
            audit_enabled: !self.no_audit,
            publish: self.git.then_some(PublishSettings {
                username: self.git_user,
                password: self.git_password,
                repo_dir: self.git_dir,
                branch: self.branch,
            }),
            notify: self.email.then_some(NotifySettings {
                from: self.email_from,
                to: self.email_to,
                password: self.email_password,
                smtp_relay: self.smtp_relay,
            }),
        }
    }
}

fn banner(settings: &Settings) {
    let border = "*".repeat(69);
    println!("{}", border.cyan());
    println!(
        "{}",
        "****              conftrail monitor has started                 ****"
            .bold()
            .cyan()
    );
    println!("{}", border.cyan());
    println!("   {}: {}", "Controller".bold(), settings.controller.host);
    println!("   {}: {}", "Watching".bold(), settings.store_path.display());
    println!("   {}: {:?}", "Interval".bold(), settings.interval);
    println!(
        "   {}: {}",
        "Audit trail".bold(),
        if settings.audit_enabled { "on".green() } else { "off".yellow() }
    );
    println!(
        "   {}: {}",
        "Publishing".bold(),
        match &settings.publish {
            Some(publish) => publish.repo_dir.display().to_string().green(),
            None => "off".yellow(),
        }
    );
    println!(
        "   {}: {}",
        "Notification".bold(),
        match &settings.notify {
            Some(notify) => notify.to.clone().green(),
            None => "off".yellow(),
        }
    );
    println!();
    println!("{}", "Press Ctrl+C to stop".dimmed());
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = cli.into_settings();

    // Incomplete option groups are fatal before the loop starts.
    settings.validate()?;

    banner(&settings);

    let source = SshClient::new(settings.controller.clone());
    let synchronizer = settings
        .publish
        .as_ref()
        .map(|publish| Synchronizer::new(SubprocessGit::new(&publish.repo_dir), publish));
    let notifier: Box<dyn Notifier> = match &settings.notify {
        Some(notify) => Box::new(SmtpNotifier::new(notify.clone())),
        None => Box::new(NoopNotifier),
    };

    Monitor::new(settings, source, synchronizer, notifier)
        .run()
        .await;

    Ok(())
}
