//! Binary UDP packet construction (growl 1.2 and older)
//!
//! Both packet kinds share a two byte header `{version, type}` followed
//! by a fixed-width field block, a variable-length data section and a
//! trailing 16-byte MD5 checksum. The checksum input is every preceding
//! byte of the packet plus the shared password, which itself is never
//! transmitted.
//!
//! All multi-byte integers are big-endian on the wire with one
//! exception: the notification flag word is packed in host byte order.
//! That quirk is wire-compatibility-relevant and must not be "fixed".

use md5::{Digest, Md5};

use crate::constants::{PacketType, GROWL_PROTOCOL_VERSION};
use crate::error::GrowlError;
use crate::session::Session;

/// Lowest accepted notification priority.
pub const PRIORITY_MIN: i8 = -2;

/// Highest accepted notification priority.
pub const PRIORITY_MAX: i8 = 2;

/// Builds a registration packet announcing the session's notification
/// types and which of them are enabled by default.
///
/// Layout: `version:u8`, `type:u8`, `appNameLen:u16be`, `numAll:u8`,
/// `numDefault:u8`, application name bytes, then per type a `u16be`
/// length plus name bytes, then one `u8` index into the all-list per
/// default entry. Default names without a registered counterpart are
/// skipped in the index data but still counted in `numDefault`.
pub fn registration_packet(session: &Session) -> Result<Vec<u8>, GrowlError> {
    let app = session.application().as_bytes();
    let all = session.notifications();
    let defaults = session.default_names();

    let app_len = u16::try_from(app.len()).map_err(|_| GrowlError::FieldTooLong {
        field: "application name",
        len: app.len(),
    })?;
    let all_count = u8::try_from(all.len()).map_err(|_| GrowlError::FieldTooLong {
        field: "notification list",
        len: all.len(),
    })?;
    let default_count = u8::try_from(defaults.len()).map_err(|_| GrowlError::FieldTooLong {
        field: "default notification list",
        len: defaults.len(),
    })?;

    let mut packet = Vec::with_capacity(32 + app.len());
    packet.push(GROWL_PROTOCOL_VERSION);
    packet.push(PacketType::Registration.to_u8());
    packet.extend_from_slice(&app_len.to_be_bytes());
    packet.push(all_count);
    packet.push(default_count);

    packet.extend_from_slice(app);

    for notification in all {
        let name = notification.name.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| GrowlError::FieldTooLong {
            field: "notification name",
            len: name.len(),
        })?;
        packet.extend_from_slice(&name_len.to_be_bytes());
        packet.extend_from_slice(name);
    }

    for name in defaults {
        if let Some(index) = all.iter().position(|n| n.name == name) {
            packet.push(index as u8);
        }
    }

    append_checksum(&mut packet, session.password());
    Ok(packet)
}

/// Builds a notification packet for a previously registered type.
///
/// Layout: `version:u8`, `type:u8`, `flags:u16` (host byte order),
/// four `u16be` lengths (name, title, description, application name),
/// then the four strings concatenated without separators.
pub fn notification_packet(
    session: &Session,
    name: &str,
    title: &str,
    description: &str,
    priority: i8,
    sticky: bool,
) -> Result<Vec<u8>, GrowlError> {
    if session.notification(name).is_none() {
        return Err(GrowlError::UnknownNotification(name.to_string()));
    }
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        return Err(GrowlError::InvalidPriority(priority));
    }

    let app = session.application().as_bytes();

    let mut packet = Vec::with_capacity(
        16 + name.len() + title.len() + description.len() + app.len(),
    );
    packet.push(GROWL_PROTOCOL_VERSION);
    packet.push(PacketType::Notification.to_u8());

    // priority occupies bits 1-3 as a signed 3-bit field, sticky is bit 0
    let mut flags: u16 = u16::from((priority as u8) & 0x7) << 1;
    if sticky {
        flags |= 1;
    }
    packet.extend_from_slice(&flags.to_ne_bytes());

    for (field, value) in [
        ("notification name", name),
        ("title", title),
        ("description", description),
        ("application name", session.application()),
    ] {
        let len = u16::try_from(value.len()).map_err(|_| GrowlError::FieldTooLong {
            field,
            len: value.len(),
        })?;
        packet.extend_from_slice(&len.to_be_bytes());
    }

    packet.extend_from_slice(name.as_bytes());
    packet.extend_from_slice(title.as_bytes());
    packet.extend_from_slice(description.as_bytes());
    packet.extend_from_slice(app);

    append_checksum(&mut packet, session.password());
    Ok(packet)
}

/// Appends the MD5 trailer. The password participates in the digest
/// but not in the transmitted payload.
fn append_checksum(packet: &mut Vec<u8>, password: Option<&str>) {
    let mut checksum = Md5::new();
    checksum.update(&packet);
    if let Some(password) = password {
        checksum.update(password.as_bytes());
    }
    let digest = checksum.finalize();
    packet.extend_from_slice(&digest);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn growlnotify_session() -> Session {
        let mut session = Session::new("growlnotify");
        session.add_notification("Command-Line Growl Notification", None, None, true);
        session
    }

    fn hexes(packet: &[u8]) -> Vec<String> {
        packet.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_registration_packet() {
        let expected = [
            "01", "00", "00", "0b", "01", "01", "67", "72", // ......gr
            "6f", "77", "6c", "6e", "6f", "74", "69", "66", // owlnotif
            "79", "00", "1f", "43", "6f", "6d", "6d", "61", // y..Comma
            "6e", "64", "2d", "4c", "69", "6e", "65", "20", // nd-Line.
            "47", "72", "6f", "77", "6c", "20", "4e", "6f", // Growl.No
            "74", "69", "66", "69", "63", "61", "74", "69", // tificati
            "6f", "6e", "00", "57", "4a", "e3", "1b", "a5", // on.WJ...
            "49", "9c", "25", "3a", "be", "75", "5d", "e5", // I.%:.u].
            "2c", "c9", "96",
        ];

        let packet = registration_packet(&growlnotify_session()).unwrap();

        assert_eq!(hexes(&packet), expected);
    }

    #[test]
    fn test_registration_packet_skips_unregistered_default() {
        let mut session = growlnotify_session();
        session.set_defaults(vec![
            "Command-Line Growl Notification".into(),
            "not registered".into(),
        ]);

        let packet = registration_packet(&session).unwrap();

        // count field reports both defaults, index data carries only one
        assert_eq!(packet[4], 1, "all count");
        assert_eq!(packet[5], 2, "default count");

        let data_end = packet.len() - 16;
        let indices = &packet[data_end - 1..data_end];
        assert_eq!(indices, [0]);
    }

    // The flag word is packed in host byte order, so the full-packet
    // vectors below (captured on a little-endian machine, checksum
    // included) only apply there.
    #[cfg(target_endian = "little")]
    #[test]
    fn test_notification_packet() {
        let expected = [
            "01", "01", "00", "00", "00", "1f", "00", "00", // ........
            "00", "02", "00", "0b", "43", "6f", "6d", "6d", // ....Comm
            "61", "6e", "64", "2d", "4c", "69", "6e", "65", // and-Line
            "20", "47", "72", "6f", "77", "6c", "20", "4e", // .Growl.N
            "6f", "74", "69", "66", "69", "63", "61", "74", // otificat
            "69", "6f", "6e", "68", "69", "67", "72", "6f", // ionhigro
            "77", "6c", "6e", "6f", "74", "69", "66", "79", // wlnotify
            "7f", "9c", "a0", "dd", "b6", "6b", "64", "75", //
            "99", "c4", "4e", "7b", "f1", "b2", "5b", "e2", //
        ];

        let packet = notification_packet(
            &growlnotify_session(),
            "Command-Line Growl Notification",
            "",
            "hi",
            0,
            false,
        )
        .unwrap();

        assert_eq!(hexes(&packet), expected);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_notification_packet_priority_negative_2() {
        let packet = notification_packet(
            &growlnotify_session(),
            "Command-Line Growl Notification",
            "",
            "hi",
            -2,
            false,
        )
        .unwrap();

        // -2 packs to 0b110 in the 3-bit field
        assert_eq!(packet[2], 0x0c);
        assert_eq!(packet[3], 0x00);

        let expected_checksum = [
            0x64, 0xb4, 0xcc, 0xa8, 0x74, 0xea, 0x30, 0x2d, //
            0x6e, 0x0f, 0xc1, 0x45, 0xb2, 0xb5, 0x58, 0x00,
        ];
        assert_eq!(packet[packet.len() - 16..], expected_checksum);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_notification_packet_flag_words() {
        let session = growlnotify_session();
        let name = "Command-Line Growl Notification";

        for (priority, sticky, flags) in [
            (-2, false, [0x0c, 0x00]),
            (-1, false, [0x0e, 0x00]),
            (0, false, [0x00, 0x00]),
            (1, false, [0x02, 0x00]),
            (2, false, [0x04, 0x00]),
            (0, true, [0x01, 0x00]),
        ] {
            let packet =
                notification_packet(&session, name, "", "hi", priority, sticky).unwrap();
            assert_eq!(
                packet[2..4],
                flags,
                "flags for priority {priority} sticky {sticky}"
            );
        }
    }

    #[test]
    fn test_notification_checksum_validates() {
        let mut session = growlnotify_session();
        session.set_password(Some("secret".into()));
        let name = "Command-Line Growl Notification";

        for priority in PRIORITY_MIN..=PRIORITY_MAX {
            for sticky in [false, true] {
                let packet =
                    notification_packet(&session, name, "title", "body", priority, sticky)
                        .unwrap();

                let (payload, checksum) = packet.split_at(packet.len() - 16);
                let mut expected = Md5::new();
                expected.update(payload);
                expected.update(b"secret");
                assert_eq!(checksum, expected.finalize().as_slice());
            }
        }
    }

    #[test]
    fn test_password_changes_checksum() {
        let session = growlnotify_session();
        let mut with_password = session.clone();
        with_password.set_password(Some("secret".into()));

        let plain = registration_packet(&session).unwrap();
        let secured = registration_packet(&with_password).unwrap();

        assert_eq!(plain[..plain.len() - 16], secured[..secured.len() - 16]);
        assert_ne!(plain[plain.len() - 16..], secured[secured.len() - 16..]);
    }

    #[test]
    fn test_notify_priority_bounds() {
        let session = growlnotify_session();
        let name = "Command-Line Growl Notification";

        for priority in [-3, 3] {
            let result = notification_packet(&session, name, "", "", priority, false);
            assert!(
                matches!(result, Err(GrowlError::InvalidPriority(p)) if p == priority),
                "priority {priority} must be rejected"
            );
        }

        for priority in [-2, 2] {
            assert!(notification_packet(&session, name, "", "", priority, false).is_ok());
        }
    }

    #[test]
    fn test_notify_unknown_type() {
        let session = growlnotify_session();

        let result = notification_packet(&session, "bad notify type", "", "", 0, false);
        assert!(matches!(
            result,
            Err(GrowlError::UnknownNotification(name)) if name == "bad notify type"
        ));
    }
}
