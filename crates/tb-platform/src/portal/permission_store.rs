use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use zbus::zvariant::OwnedValue;
use zbus::{proxy, Connection};

use tb_core::ports::PermissionStorePort;

use super::bus_name_has_owner;

const STORE_BUS_NAME: &str = "org.freedesktop.impl.portal.PermissionStore";
const STORE_TABLE: &str = "kde-authorized";
const STORE_RESOURCE: &str = "remote-desktop";

#[proxy(
    interface = "org.freedesktop.impl.portal.PermissionStore",
    default_service = "org.freedesktop.impl.portal.PermissionStore",
    default_path = "/org/freedesktop/impl/portal/PermissionStore"
)]
trait PermissionStore {
    fn lookup(
        &self,
        table: &str,
        id: &str,
    ) -> zbus::Result<(HashMap<String, Vec<String>>, OwnedValue)>;

    fn set_permission(
        &self,
        table: &str,
        create: bool,
        id: &str,
        app: &str,
        permissions: Vec<&str>,
    ) -> zbus::Result<()>;
}

/// Durable permission grants, written to the same table the compositor's
/// own authorization prompt uses. A grant here lets future sessions start
/// without an interactive dialog.
pub struct PortalPermissionStore {
    proxy: PermissionStoreProxy<'static>,
    available: bool,
}

impl PortalPermissionStore {
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session()
            .await
            .context("failed to connect to session bus")?;
        let available = bus_name_has_owner(&connection, STORE_BUS_NAME).await;
        let proxy = PermissionStoreProxy::new(&connection)
            .await
            .context("failed to create PermissionStore proxy")?;
        Ok(Self { proxy, available })
    }
}

/// Stand-in used when the session bus itself is unreachable.
pub struct UnavailablePermissionStore;

#[async_trait]
impl PermissionStorePort for UnavailablePermissionStore {
    fn is_available(&self) -> bool {
        false
    }

    async fn probe(&self, _app_id: &str) -> Result<bool> {
        anyhow::bail!("permission store unavailable")
    }

    async fn grant(&self, _app_id: &str) -> Result<()> {
        anyhow::bail!("permission store unavailable")
    }
}

#[async_trait]
impl PermissionStorePort for PortalPermissionStore {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn probe(&self, app_id: &str) -> Result<bool> {
        match self.proxy.lookup(STORE_TABLE, STORE_RESOURCE).await {
            Ok((permissions, _data)) => Ok(permissions
                .get(app_id)
                .is_some_and(|values| values.iter().any(|v| v == "yes"))),
            // An absent table or entry means no grant was ever written.
            Err(zbus::Error::MethodError(name, _, _))
                if name.as_str().ends_with("NotFound") =>
            {
                Ok(false)
            }
            Err(e) => Err(e).context("PermissionStore.Lookup call failed"),
        }
    }

    async fn grant(&self, app_id: &str) -> Result<()> {
        self.proxy
            .set_permission(STORE_TABLE, true, STORE_RESOURCE, app_id, vec!["yes"])
            .await
            .context("PermissionStore.SetPermission call failed")
    }
}
