//! Notification session state shared by both codecs

use crate::crypto::Encryption;

/// Icon reference attached to an application or notification type.
///
/// A URL is emitted directly in GNTP headers; a byte blob is carried
/// out-of-band as a resource block and referenced by generated id.
/// The binary UDP protocol has no icon support and ignores these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    Url(String),
    Data(Vec<u8>),
}

/// One registered notification type. Created by [`Session::add_notification`],
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationType {
    /// Internal name, unique within a session
    pub name: String,
    /// Name shown to the user, if different
    pub display_name: Option<String>,
    /// Icon shown with notifications of this type
    pub icon: Option<Icon>,
    /// Whether the type is enabled by default
    pub enabled: bool,
}

/// State for one logical client connection: the application identity,
/// the registered notification types (insertion order is significant
/// for the binary protocol's default-index encoding), the shared
/// password and, for GNTP, the application icon and encryption mode.
///
/// A session is mutated only by the owning caller, before any
/// transmission that depends on it. No internal synchronization is
/// performed.
#[derive(Debug, Clone, Default)]
pub struct Session {
    application: String,
    password: Option<String>,
    icon: Option<Icon>,
    encryption: Encryption,
    notifications: Vec<NotificationType>,
    defaults: Option<Vec<String>>,
}

impl Session {
    pub fn new(application: impl Into<String>) -> Self {
        Session {
            application: application.into(),
            ..Session::default()
        }
    }

    /// Registers a notification type. Order of registration is the
    /// order used on the wire.
    pub fn add_notification(
        &mut self,
        name: impl Into<String>,
        display_name: Option<String>,
        icon: Option<Icon>,
        enabled: bool,
    ) {
        self.notifications.push(NotificationType {
            name: name.into(),
            display_name,
            icon,
            enabled,
        });
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    /// Sets the application-level icon (GNTP only).
    pub fn set_icon(&mut self, icon: Option<Icon>) {
        self.icon = icon;
    }

    /// Selects the GNTP body encryption mode. Requires a password.
    pub fn set_encryption(&mut self, encryption: Encryption) {
        self.encryption = encryption;
    }

    /// Overrides the binary protocol's default-notification list. The
    /// list is not required to be a subset of the registered types;
    /// names without a registered counterpart are skipped in the index
    /// data while still counted in the packet's count field, matching
    /// the behavior of existing clients.
    pub fn set_defaults(&mut self, defaults: Vec<String>) {
        self.defaults = Some(defaults);
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub fn notifications(&self) -> &[NotificationType] {
        &self.notifications
    }

    /// Looks up a registered type by name.
    pub fn notification(&self, name: &str) -> Option<&NotificationType> {
        self.notifications.iter().find(|n| n.name == name)
    }

    /// Names on the binary protocol's default list: the explicit
    /// override if one was set, otherwise every enabled type.
    pub fn default_names(&self) -> Vec<&str> {
        match &self.defaults {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => self
                .notifications
                .iter()
                .filter(|n| n.enabled)
                .map(|n| n.name.as_str())
                .collect(),
        }
    }
}
