mod permission_store;
mod remote_desktop;

pub use permission_store::{PortalPermissionStore, UnavailablePermissionStore};
pub use remote_desktop::{PortalRemoteInput, UnavailableRemoteInput};

use zbus::Connection;

pub(crate) const PORTAL_BUS_NAME: &str = "org.freedesktop.portal.Desktop";

/// Probes whether a well-known bus name currently has an owner.
pub(crate) async fn bus_name_has_owner(connection: &Connection, name: &str) -> bool {
    let Ok(dbus) = zbus::fdo::DBusProxy::new(connection).await else {
        return false;
    };
    let Ok(bus_name) = name.try_into() else {
        return false;
    };
    dbus.name_has_owner(bus_name).await.unwrap_or(false)
}

/// Derives the request object path the broker will use for a call made by
/// `unique_name` with `handle_token`: the leading `:` is stripped and every
/// `.` becomes `_`.
pub(crate) fn predicted_request_path(unique_name: &str, handle_token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!(
        "/org/freedesktop/portal/desktop/request/{}/{}",
        sender, handle_token
    )
}
