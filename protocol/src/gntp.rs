//! GNTP packet construction (growl 1.3 and later)
//!
//! A GNTP request is an info line, a CRLF-joined header block and zero
//! or more binary resource blocks. When a password is configured the
//! info line carries key-derivation material; when encryption is
//! enabled the header block and every resource payload are encrypted
//! with the derived key and a single IV.

use uuid::Uuid;

use crate::constants::GNTP_VERSION;
use crate::crypto::{self, Encryption, HashAlgorithm, KeyMaterial, RandomSalt, SaltSource};
use crate::error::GrowlError;
use crate::session::{Icon, Session};
use crate::udp::{PRIORITY_MAX, PRIORITY_MIN};

/// Software identification sent in every request envelope.
pub const ORIGIN_SOFTWARE_NAME: &str = "growl-rs";

/// Version sent in every request envelope.
pub const ORIGIN_SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source of unique tokens for notification and resource identifiers,
/// injectable for deterministic tests.
pub trait IdSource {
    fn generate(&mut self) -> String;
}

/// Default id source producing random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn generate(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Request kinds this client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Register,
    Notify,
}

impl PacketKind {
    pub fn token(self) -> &'static str {
        match self {
            PacketKind::Register => "REGISTER",
            PacketKind::Notify => "NOTIFY",
        }
    }
}

/// Out-of-band binary attachment referenced from a header by id.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: String,
    pub data: Vec<u8>,
}

/// One notification request. `callback_url` asks the server to open a
/// URL on interaction; a local callback handler is supplied to the
/// transport instead and must not be combined with a URL.
#[derive(Debug, Clone, Default)]
pub struct Notification {
    pub name: String,
    pub title: String,
    pub text: Option<String>,
    pub priority: i8,
    pub sticky: bool,
    pub coalesce_id: Option<String>,
    pub callback_url: Option<String>,
}

impl Notification {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Notification {
            name: name.into(),
            title: title.into(),
            ..Notification::default()
        }
    }
}

/// Builds GNTP request packets for a session. Holds the id and salt
/// sources plus the digest used for authentication.
#[derive(Debug)]
pub struct GntpCodec<I = UuidSource, S = RandomSalt> {
    hash: HashAlgorithm,
    ids: I,
    salts: S,
}

impl GntpCodec {
    pub fn new() -> Self {
        GntpCodec::with_parts(HashAlgorithm::Sha512, UuidSource, RandomSalt)
    }
}

impl Default for GntpCodec {
    fn default() -> Self {
        GntpCodec::new()
    }
}

impl<I: IdSource, S: SaltSource> GntpCodec<I, S> {
    pub fn with_parts(hash: HashAlgorithm, ids: I, salts: S) -> Self {
        GntpCodec { hash, ids, salts }
    }

    /// Builds a REGISTER packet from the session's notification types
    /// and application icon.
    pub fn registration_packet(&mut self, session: &Session) -> Result<Vec<u8>, GrowlError> {
        let mut headers = Vec::new();
        let mut resources = Vec::new();

        if let Some(icon) = session.icon() {
            self.icon_header("Application-Icon", icon, &mut headers, &mut resources);
        }

        headers.push(format!(
            "Notifications-Count: {}",
            session.notifications().len()
        ));
        headers.push(String::new());

        for notification in session.notifications() {
            headers.push(format!("Notification-Name: {}", notification.name));
            if let Some(display_name) = &notification.display_name {
                headers.push(format!("Notification-Display-Name: {display_name}"));
            }
            if notification.enabled {
                headers.push("Notification-Enabled: true".to_string());
            }
            if let Some(icon) = &notification.icon {
                self.icon_header("Notification-Icon", icon, &mut headers, &mut resources);
            }
            headers.push(String::new());
        }
        headers.pop();

        self.packet(session, PacketKind::Register, headers, resources)
    }

    /// Builds a NOTIFY packet. `has_handler` records whether the caller
    /// supplied a local callback handler; combined with a callback URL
    /// that is ambiguous and rejected before any bytes are produced.
    pub fn notification_packet(
        &mut self,
        session: &Session,
        note: &Notification,
        has_handler: bool,
    ) -> Result<Vec<u8>, GrowlError> {
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&note.priority) {
            return Err(GrowlError::InvalidPriority(note.priority));
        }
        if has_handler && note.callback_url.is_some() {
            return Err(GrowlError::AmbiguousCallback);
        }

        let mut headers = Vec::new();
        let mut resources = Vec::new();

        headers.push(format!("Notification-ID: {}", self.ids.generate()));
        if let Some(coalesce_id) = &note.coalesce_id {
            headers.push(format!("Notification-Coalescing-ID: {coalesce_id}"));
        }
        headers.push(format!("Notification-Name: {}", note.name));
        headers.push(format!("Notification-Title: {}", note.title));
        if let Some(text) = &note.text {
            headers.push(format!("Notification-Text: {text}"));
        }
        if note.priority != 0 {
            headers.push(format!("Notification-Priority: {}", note.priority));
        }
        if note.sticky {
            headers.push("Notification-Sticky: True".to_string());
        }

        // the icon registered for this type is sent with every
        // notification; registration-time icons are not stored by
        // every server implementation
        if let Some(icon) = session
            .notification(&note.name)
            .and_then(|n| n.icon.as_ref())
        {
            self.icon_header("Notification-Icon", icon, &mut headers, &mut resources);
        }

        if has_handler || note.callback_url.is_some() {
            headers.push("Notification-Callback-Context: context".to_string());
            headers.push("Notification-Callback-Context-Type: type".to_string());
            if let Some(url) = &note.callback_url {
                headers.push(format!("Notification-Callback-Target: {url}"));
            }
        }

        self.packet(session, PacketKind::Notify, headers, resources)
    }

    /// Assembles a complete packet of the given kind: info line, the
    /// envelope plus `headers`, and one block per resource. Handles
    /// authentication and encryption.
    pub fn packet(
        &mut self,
        session: &Session,
        kind: PacketKind,
        headers: Vec<String>,
        resources: Vec<Resource>,
    ) -> Result<Vec<u8>, GrowlError> {
        let mut body_lines = vec![
            format!("Application-Name: {}", session.application()),
            format!("Origin-Software-Name: {ORIGIN_SOFTWARE_NAME}"),
            format!("Origin-Software-Version: {ORIGIN_SOFTWARE_VERSION}"),
            format!("Origin-Platform-Name: {}", std::env::consts::OS),
            "Connection: close".to_string(),
        ];
        body_lines.extend(headers);

        let mut body = body_lines.join("\r\n").into_bytes();
        body.extend_from_slice(b"\r\n");

        let key_section = session.password().map(|password| {
            let salt = self.salts.salt();
            let material = crypto::derive_key(self.hash, password, &salt);
            let key_info = crypto::key_info(self.hash, &material, &salt);
            (material, key_info)
        });

        let mode = session.encryption();
        let mut info = format!("GNTP/{GNTP_VERSION} {} ", kind.token());

        let iv = match mode {
            Encryption::None => {
                info.push_str(mode.token());
                None
            }
            _ => {
                let key = encryption_key(&key_section)?;
                let iv = self.salts.iv(mode.iv_len());
                info.push_str(&format!("{}:{}", mode.token(), hex::encode(&iv)));
                body = crypto::encrypt(mode, key, &iv, &body)?;
                Some(iv)
            }
        };

        if let Some((_, key_info)) = &key_section {
            info.push(' ');
            info.push_str(key_info);
        }

        let mut sections: Vec<Vec<u8>> = vec![info.into_bytes(), body];

        for resource in resources {
            let data = match &iv {
                Some(iv) => {
                    let key = encryption_key(&key_section)?;
                    crypto::encrypt(mode, key, iv, &resource.data)?
                }
                None => resource.data,
            };
            sections.push(format!("Identifier: {}", resource.id).into_bytes());
            sections.push(format!("Length: {}", data.len()).into_bytes());
            sections.push(Vec::new());
            sections.push(data);
            sections.push(Vec::new());
        }

        sections.push(Vec::new());
        sections.push(Vec::new());

        Ok(sections.join(&b"\r\n"[..]))
    }

    fn icon_header(
        &mut self,
        header: &str,
        icon: &Icon,
        headers: &mut Vec<String>,
        resources: &mut Vec<Resource>,
    ) {
        match icon {
            Icon::Url(url) => headers.push(format!("{header}: {url}")),
            Icon::Data(data) => {
                let id = self.ids.generate();
                headers.push(format!("{header}: x-growl-resource://{id}"));
                resources.push(Resource {
                    id,
                    data: data.clone(),
                });
            }
        }
    }
}

fn encryption_key(key_section: &Option<(KeyMaterial, String)>) -> Result<&[u8], GrowlError> {
    match key_section {
        Some((material, _)) => Ok(&material.key),
        None => Err(GrowlError::MissingPassword),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SALT_SIZE;

    struct FixedIds;

    impl IdSource for FixedIds {
        fn generate(&mut self) -> String {
            "4".to_string()
        }
    }

    struct FixedSalt;

    impl SaltSource for FixedSalt {
        fn salt(&mut self) -> [u8; SALT_SIZE] {
            [9u8; SALT_SIZE]
        }

        fn iv(&mut self, len: usize) -> Vec<u8> {
            vec![1u8; len]
        }
    }

    fn codec() -> GntpCodec<FixedIds, FixedSalt> {
        GntpCodec::with_parts(HashAlgorithm::Sha512, FixedIds, FixedSalt)
    }

    fn session() -> Session {
        Session::new("test-app")
    }

    fn envelope() -> String {
        format!(
            "Application-Name: test-app\r\n\
             Origin-Software-Name: {ORIGIN_SOFTWARE_NAME}\r\n\
             Origin-Software-Version: {ORIGIN_SOFTWARE_VERSION}\r\n\
             Origin-Platform-Name: {}\r\n\
             Connection: close",
            std::env::consts::OS
        )
    }

    #[test]
    fn test_packet() {
        let packet = codec()
            .packet(
                &session(),
                PacketKind::Register,
                vec!["Foo: bar".to_string()],
                vec![],
            )
            .unwrap();

        let expected = format!("GNTP/1.0 REGISTER NONE\r\n{}\r\nFoo: bar\r\n\r\n\r\n", envelope());
        assert_eq!(packet, expected.as_bytes());
    }

    #[test]
    fn test_packet_hash() {
        let mut session = session();
        session.set_password(Some("password".to_string()));

        let packet = codec()
            .packet(
                &session,
                PacketKind::Register,
                vec!["Foo: bar".to_string()],
                vec![],
            )
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        let salt = [9u8; SALT_SIZE];
        let material = crypto::derive_key(HashAlgorithm::Sha512, "password", &salt);
        let expected_info = format!(
            "GNTP/1.0 REGISTER NONE SHA512:{}.{}",
            material.key_hash,
            hex::encode(salt)
        );

        let (info, body) = packet.split_once("\r\n").unwrap();
        assert_eq!(info, expected_info);

        // authentication alone leaves the body as plain bytes
        assert_eq!(body, format!("{}\r\nFoo: bar\r\n\r\n\r\n", envelope()));
    }

    #[test]
    fn test_packet_encrypted() {
        for mode in [Encryption::Des, Encryption::TripleDes, Encryption::Aes] {
            let mut session = session();
            session.set_password(Some("password".to_string()));
            session.set_encryption(mode);

            let packet = codec()
                .packet(
                    &session,
                    PacketKind::Register,
                    vec!["Foo: bar".to_string()],
                    vec![],
                )
                .unwrap();

            let newline = packet.iter().position(|&b| b == b'\r').unwrap();
            let info = std::str::from_utf8(&packet[..newline]).unwrap();

            let salt = [9u8; SALT_SIZE];
            let material = crypto::derive_key(HashAlgorithm::Sha512, "password", &salt);
            let iv = vec![1u8; mode.iv_len()];
            let expected_info = format!(
                "GNTP/1.0 REGISTER {}:{} SHA512:{}.{}",
                mode.token(),
                hex::encode(&iv),
                material.key_hash,
                hex::encode(salt)
            );
            assert_eq!(info, expected_info);

            // encrypted packets terminate with a single blank line
            let ciphertext = &packet[newline + 2..packet.len() - 4];
            assert_eq!(&packet[packet.len() - 4..], b"\r\n\r\n");

            let decrypted = crypto::decrypt(mode, &material.key, &iv, ciphertext).unwrap();
            let expected_body = format!("{}\r\nFoo: bar\r\n", envelope());
            assert_eq!(decrypted, expected_body.as_bytes());
        }
    }

    #[test]
    fn test_packet_encrypted_resource_shares_key_and_iv() {
        let mut session = session();
        session.set_password(Some("password".to_string()));
        session.set_encryption(Encryption::Aes);

        let icon = vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x13, 0x37];
        let packet = codec()
            .packet(
                &session,
                PacketKind::Register,
                vec![],
                vec![Resource {
                    id: "icon".to_string(),
                    data: icon.clone(),
                }],
            )
            .unwrap();

        let salt = [9u8; SALT_SIZE];
        let material = crypto::derive_key(HashAlgorithm::Sha512, "password", &salt);
        let iv = vec![1u8; 16];

        let marker = b"\r\nIdentifier: icon\r\nLength: 16\r\n\r\n";
        let start = packet
            .windows(marker.len())
            .position(|window| window == marker)
            .expect("resource block present")
            + marker.len();
        let data = &packet[start..start + 16];

        let expected = crypto::encrypt(Encryption::Aes, &material.key, &iv, &icon).unwrap();
        assert_eq!(data, expected);
        assert!(packet.ends_with(b"\r\n\r\n\r\n"));
    }

    #[test]
    fn test_packet_encryption_without_password() {
        let mut session = session();
        session.set_encryption(Encryption::Des);

        let result = codec().packet(&session, PacketKind::Register, vec![], vec![]);
        assert!(matches!(result, Err(GrowlError::MissingPassword)));
    }

    #[test]
    fn test_packet_register() {
        let mut session = session();
        session.add_notification("test-note", None, None, true);

        let packet = codec().registration_packet(&session).unwrap();

        let expected = format!(
            "GNTP/1.0 REGISTER NONE\r\n{}\r\n\
             Notifications-Count: 1\r\n\
             \r\n\
             Notification-Name: test-note\r\n\
             Notification-Enabled: true\r\n\
             \r\n\r\n",
            envelope()
        );
        assert_eq!(packet, expected.as_bytes());
    }

    #[test]
    fn test_packet_register_disabled() {
        let mut session = session();
        session.add_notification("test-note", None, None, false);

        let packet = codec().registration_packet(&session).unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(!packet.contains("Notification-Enabled"));
    }

    #[test]
    fn test_packet_register_display_name() {
        let mut session = session();
        session.add_notification("test-note", Some("Test Note".to_string()), None, true);

        let packet = codec().registration_packet(&session).unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains(
            "Notification-Name: test-note\r\n\
             Notification-Display-Name: Test Note\r\n\
             Notification-Enabled: true"
        ));
    }

    #[test]
    fn test_packet_register_application_icon() {
        let mut session = session();
        session.set_icon(Some(Icon::Data(b"icon-bytes".to_vec())));
        session.add_notification("test-note", None, None, true);

        let packet = codec().registration_packet(&session).unwrap();

        let expected = format!(
            "GNTP/1.0 REGISTER NONE\r\n{}\r\n\
             Application-Icon: x-growl-resource://4\r\n\
             Notifications-Count: 1\r\n\
             \r\n\
             Notification-Name: test-note\r\n\
             Notification-Enabled: true\r\n\
             \r\n\
             Identifier: 4\r\n\
             Length: 10\r\n\
             \r\n\
             icon-bytes\r\n\
             \r\n\r\n",
            envelope()
        );
        assert_eq!(packet, expected.as_bytes());
    }

    #[test]
    fn test_packet_register_application_icon_url() {
        let mut session = session();
        session.set_icon(Some(Icon::Url("http://example/icon.png".to_string())));
        session.add_notification("test-note", None, None, true);

        let packet = codec().registration_packet(&session).unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains("Application-Icon: http://example/icon.png\r\n"));
        assert!(!packet.contains("Identifier:"));
    }

    #[test]
    fn test_packet_notify() {
        let packet = codec()
            .notification_packet(&session(), &Notification::new("test-note", "title"), false)
            .unwrap();

        let expected = format!(
            "GNTP/1.0 NOTIFY NONE\r\n{}\r\n\
             Notification-ID: 4\r\n\
             Notification-Name: test-note\r\n\
             Notification-Title: title\r\n\
             \r\n\r\n",
            envelope()
        );
        assert_eq!(packet, expected.as_bytes());
    }

    #[test]
    fn test_packet_notify_optional_headers() {
        let mut note = Notification::new("test-note", "title");
        note.text = Some("message".to_string());
        note.priority = 2;
        note.sticky = true;
        note.coalesce_id = Some("3".to_string());

        let packet = codec()
            .notification_packet(&session(), &note, false)
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains("Notification-Coalescing-ID: 3\r\n"));
        assert!(packet.contains("Notification-Text: message\r\n"));
        assert!(packet.contains("Notification-Priority: 2\r\n"));
        assert!(packet.contains("Notification-Sticky: True\r\n"));
    }

    #[test]
    fn test_packet_notify_priority_zero_omitted() {
        let packet = codec()
            .notification_packet(&session(), &Notification::new("test-note", "title"), false)
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(!packet.contains("Notification-Priority"));
        assert!(!packet.contains("Notification-Sticky"));
    }

    #[test]
    fn test_packet_notify_icon_from_session() {
        let mut session = session();
        session.add_notification(
            "test-note",
            None,
            Some(Icon::Url("http://example/icon.png".to_string())),
            true,
        );

        let packet = codec()
            .notification_packet(&session, &Notification::new("test-note", "title"), false)
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains("Notification-Icon: http://example/icon.png\r\n"));
    }

    #[test]
    fn test_packet_notify_callback_handler() {
        let packet = codec()
            .notification_packet(&session(), &Notification::new("test-note", "title"), true)
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains("Notification-Callback-Context: context\r\n"));
        assert!(packet.contains("Notification-Callback-Context-Type: type\r\n"));
        assert!(!packet.contains("Notification-Callback-Target"));
    }

    #[test]
    fn test_packet_notify_callback_url() {
        let mut note = Notification::new("test-note", "title");
        note.callback_url = Some("http://example".to_string());

        let packet = codec()
            .notification_packet(&session(), &note, false)
            .unwrap();
        let packet = String::from_utf8(packet).unwrap();

        assert!(packet.contains("Notification-Callback-Target: http://example\r\n"));
    }

    #[test]
    fn test_packet_notify_ambiguous_callback() {
        let mut note = Notification::new("test-note", "title");
        note.callback_url = Some("http://example".to_string());

        let result = codec().notification_packet(&session(), &note, true);
        assert!(matches!(result, Err(GrowlError::AmbiguousCallback)));
    }

    #[test]
    fn test_packet_notify_priority_bounds() {
        for priority in [-3, 3] {
            let mut note = Notification::new("test-note", "title");
            note.priority = priority;

            let result = codec().notification_packet(&session(), &note, false);
            assert!(matches!(
                result,
                Err(GrowlError::InvalidPriority(p)) if p == priority
            ));
        }

        for priority in [-2, 2] {
            let mut note = Notification::new("test-note", "title");
            note.priority = priority;
            assert!(codec().notification_packet(&session(), &note, false).is_ok());
        }
    }
}
