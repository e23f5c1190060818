//! NickelDBus client.
//!
//! NickelDBus is an optional add-on that exposes parts of the Kobo reader
//! software (dialogs, library rescans) on the system bus.

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use tracing::{debug, info, warn};

use super::bus::{LibraryBus, ScanKind};
use super::error::Result;

/// Well-known name and interface of the service.
pub const SERVICE: &str = "com.github.shermp.nickeldbus";

/// Object path of the service.
pub const OBJECT_PATH: &str = "/nickeldbus";

/// Version this program was tested against.
pub const EXPECTED_VERSION: &str = "0.2.0";

/// Signal emitted once a library rescan has finished.
pub const DONE_SIGNAL: &str = "pfmDoneProcessing";

#[zbus::proxy(
    interface = "com.github.shermp.nickeldbus",
    default_service = "com.github.shermp.nickeldbus",
    default_path = "/nickeldbus",
    gen_blocking = false
)]
trait NickelDbus {
    #[zbus(name = "ndbVersion")]
    fn ndb_version(&self) -> zbus::Result<String>;

    #[zbus(name = "dlgConfirmCreate")]
    fn dlg_confirm_create(&self) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmSetTitle")]
    fn dlg_confirm_set_title(&self, title: &str) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmSetBody")]
    fn dlg_confirm_set_body(&self, body: &str) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmSetModal")]
    fn dlg_confirm_set_modal(&self, modal: bool) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmShowClose")]
    fn dlg_confirm_show_close(&self, show: bool) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmSetAccept")]
    fn dlg_confirm_set_accept(&self, label: &str) -> zbus::Result<()>;

    #[zbus(name = "dlgConfirmShow")]
    fn dlg_confirm_show(&self) -> zbus::Result<()>;

    #[zbus(name = "pfmRescanBooks")]
    fn pfm_rescan_books(&self) -> zbus::Result<()>;

    #[zbus(name = "pfmRescanBooksFull")]
    fn pfm_rescan_books_full(&self) -> zbus::Result<()>;
}

/// A connection to NickelDBus on the system bus.
pub struct NickelBus {
    proxy: NickelDbusProxy<'static>,
}

impl NickelBus {
    /// Connects to the system bus. Does not check that the service exists.
    pub async fn connect() -> Result<Self> {
        let connection = zbus::Connection::system().await?;
        let proxy = NickelDbusProxy::new(&connection).await?;
        Ok(Self { proxy })
    }

    /// Checks whether the service answers introspection.
    pub async fn is_installed(&self) -> bool {
        let installed = self.proxy.inner().introspect().await.is_ok();
        debug!(installed, "NickelDbus install check");
        installed
    }

    /// Returns the version reported by the service.
    pub async fn version(&self) -> Result<String> {
        let version = self.proxy.ndb_version().await?;
        debug!(version = %version, "NickelDbus version");
        Ok(version)
    }

    /// Connects and checks that the service can be used.
    ///
    /// Returns `None` when the bus or the service is unreachable, or when
    /// the version query fails. A version other than [`EXPECTED_VERSION`]
    /// only produces a warning.
    pub async fn probe() -> Option<Self> {
        let bus = match Self::connect().await {
            Ok(bus) => bus,
            Err(e) => {
                debug!(error = %e, "System bus unavailable");
                return None;
            }
        };

        if !bus.is_installed().await {
            debug!("Did not find NickelDbus");
            return None;
        }

        match bus.version().await {
            Ok(version) if version == EXPECTED_VERSION => {}
            Ok(version) => {
                warn!(
                    wanted = EXPECTED_VERSION,
                    actual = %version,
                    "NickelDbus version mismatch"
                );
            }
            Err(e) => {
                warn!(error = %e, "NickelDbus version check failed, not using it");
                return None;
            }
        }

        info!("Using NickelDbus for notifications and library rescans");
        Some(bus)
    }
}

#[async_trait]
impl LibraryBus for NickelBus {
    async fn subscribe(&self, signal: &str) -> Result<BoxStream<'static, String>> {
        // Match rule on the member; the service also broadcasts network and
        // dialog signals.
        let signals = self.proxy.inner().receive_signal(signal.to_string()).await?;
        Ok(signals
            .map(|message| {
                message
                    .header()
                    .member()
                    .map(|member| member.as_str().to_string())
                    .unwrap_or_default()
            })
            .boxed())
    }

    async fn trigger_rescan(&self, kind: ScanKind) -> Result<()> {
        match kind {
            ScanKind::Incremental => self.proxy.pfm_rescan_books().await?,
            ScanKind::Full => self.proxy.pfm_rescan_books_full().await?,
        }
        Ok(())
    }

    async fn dialog_create(&self, title: &str, body: &str) -> Result<()> {
        self.proxy.dlg_confirm_create().await?;
        self.proxy.dlg_confirm_set_title(title).await?;
        self.proxy.dlg_confirm_set_body(body).await?;
        self.proxy.dlg_confirm_set_modal(false).await?;
        self.proxy.dlg_confirm_show_close(false).await?;
        self.proxy.dlg_confirm_show().await?;
        Ok(())
    }

    async fn dialog_set_body(&self, body: &str) -> Result<()> {
        self.proxy.dlg_confirm_set_body(body).await?;
        Ok(())
    }

    async fn dialog_set_accept(&self, label: &str) -> Result<()> {
        self.proxy.dlg_confirm_set_accept(label).await?;
        Ok(())
    }
}
