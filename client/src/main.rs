//! growl - command-line Growl notification sender
//!
//! Speaks both Growl wire protocols: GNTP over TCP (the default) and
//! the legacy binary protocol over UDP.

mod config;
mod discovery;
mod gntp;
mod udp;

use anyhow::Result;
use clap::Parser;
use protocol::gntp::Notification;
use protocol::{Icon, Session};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "growl")]
#[command(version)]
#[command(about = "Send Growl notifications over GNTP or the legacy UDP protocol", long_about = None)]
struct Args {
    /// Growl server hostname
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "growl.conf")]
    config: PathBuf,

    /// Application name to register under
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Notification type
    #[arg(short = 'y', long = "type", default_value = "Command-Line Growl Notification")]
    kind: String,

    /// Notification title
    #[arg(short, long, default_value = "")]
    title: String,

    /// Message text; read from standard input when omitted
    #[arg(short, long)]
    message: Option<String>,

    /// Priority, -2 (very low) to 2 (emergency)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    priority: i8,

    /// Keep the notification on screen until dismissed
    #[arg(short, long)]
    sticky: bool,

    /// Shared password
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Icon URL for the notification type (GNTP only)
    #[arg(long)]
    icon: Option<String>,

    /// URL to open when the notification is clicked (GNTP only)
    #[arg(long)]
    callback: Option<String>,

    /// Use the legacy binary UDP protocol
    #[arg(long)]
    udp: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let config = config::Config::load(&args.config)?;
    debug!("Loaded configuration from {:?}", args.config);

    let host = args
        .host
        .clone()
        .unwrap_or_else(|| config.general.host.clone());
    let application = args
        .name
        .clone()
        .unwrap_or_else(|| config.general.application.clone());

    let message = match &args.message {
        Some(message) => message.clone(),
        None => {
            let mut message = String::new();
            std::io::stdin().read_to_string(&mut message)?;
            message.trim_end().to_string()
        }
    };

    let mut session = Session::new(application);
    session.set_password(args.password.clone().or(config.auth.password.clone()));
    session.set_encryption(config.encryption()?);
    session.add_notification(
        args.kind.clone(),
        None,
        args.icon.clone().map(Icon::Url),
        true,
    );

    let use_udp = args.udp || config.general.protocol == "udp";
    if use_udp {
        run_udp(&host, session, &args, &message)
    } else {
        run_gntp(&host, session, &args, &message)
    }
}

fn run_udp(host: &str, session: Session, args: &Args, message: &str) -> Result<()> {
    let notifier = udp::UdpNotifier::connect(host, session)?;
    notifier.notify(&args.kind, &args.title, message, args.priority, args.sticky)?;
    info!("Notification sent to {} (udp)", host);
    Ok(())
}

fn run_gntp(host: &str, session: Session, args: &Args, message: &str) -> Result<()> {
    let mut client = gntp::GntpClient::connect(host, session);
    client.register()?;

    let mut note = Notification::new(&args.kind, &args.title);
    note.text = Some(message.to_string());
    note.priority = args.priority;
    note.sticky = args.sticky;
    note.callback_url = args.callback.clone();

    client.notify(&note)?;
    info!("Notification sent to {} (gntp)", host);
    Ok(())
}
