//! Startup and fatal-error banners, framed like the heartbeat notices.

use tracing::Level;
use warden_heartbeat::notice::Frame;
use warden_protocol::ServerProfile;

use crate::WardenError;

/// The server-info block printed once authentication succeeds.
pub fn server_info_frame(profile: &ServerProfile) -> Frame {
    let description = if profile.description.trim().is_empty() {
        "(no description)"
    } else {
        profile.description.as_str()
    };

    Frame::new("SERVER INFO")
        .field("Server Name", &profile.name)
        .field("Description", description)
        .field("Owner", &profile.owner_name)
        .field("Language", &profile.language)
        .field("Type", profile.visibility())
}

pub fn server_info(profile: &ServerProfile) {
    server_info_frame(profile).log(Level::INFO);
}

/// The block printed right before the host shuts down on a fatal error.
pub fn critical_error_frame(err: &WardenError) -> Frame {
    Frame::new("CRITICAL ERROR")
        .line(err.to_string())
        .blank()
        .line(err.remediation())
        .blank()
        .centered("THE SERVER WILL NOW SHUT DOWN")
}

pub fn critical_error(err: &WardenError) {
    critical_error_frame(err).log(Level::ERROR);
}
