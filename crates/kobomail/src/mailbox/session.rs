//! IMAP session lifecycle.
//!
//! `ImapConnection::connect` -> `login` -> `ImapSession::select_mailbox`
//! -> search / delete -> `logout`. Each step consumes or borrows the
//! previous state, so a session cannot be used after logout.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use chrono::Utc;
use futures_util::io::{AsyncRead, AsyncWrite};
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use super::error::{MailboxError, Result};
use super::message::MessageHandle;
use super::search::SearchPredicate;
use super::Mailbox;

/// Number of extra dial attempts after the first one fails.
pub const DIAL_RETRIES: u32 = 3;

/// Pause between dial attempts.
pub const DIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
pub type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// A byte stream an IMAP client can run over.
pub trait ImapTransport: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send {}

impl<T> ImapTransport for T where T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send {}

/// Items fetched for every matching message.
const FETCH_ITEMS: &str = "(UID FLAGS INTERNALDATE BODY[])";

/// A connection to the server that has not authenticated yet.
pub struct ImapConnection<T: ImapTransport = TlsStream> {
    host: String,
    port: u16,
    client: async_imap::Client<T>,
}

impl ImapConnection<TlsStream> {
    /// Opens a TLS connection, retrying the dial [`DIAL_RETRIES`] times.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = retry_dial(DIAL_RETRIES, DIAL_RETRY_DELAY, || dial(host, port)).await?;

        info!("Connected to IMAP server at {}:{}", host, port);
        Ok(Self::from_stream(host, port, stream))
    }
}

impl<T: ImapTransport> ImapConnection<T> {
    /// Wraps an already established stream to `host:port`.
    pub fn from_stream(host: &str, port: u16, stream: T) -> Self {
        Self {
            host: host.to_string(),
            port,
            client: async_imap::Client::new(stream),
        }
    }

    /// Authenticates with a plain LOGIN. Not retried.
    pub async fn login(self, username: &str, password: &SecretString) -> Result<ImapSession<T>> {
        let session = self
            .client
            .login(username, password.expose_secret())
            .await
            .map_err(|(e, _)| MailboxError::AuthenticationFailed(e.to_string()))?;

        info!("Authenticated to IMAP server as {}", username);
        Ok(ImapSession {
            host: self.host,
            port: self.port,
            session,
            selected: None,
        })
    }
}

/// Status of the selected mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxInfo {
    pub name: String,
    pub exists: u32,
    pub uid_validity: Option<u32>,
}

/// An authenticated IMAP session.
pub struct ImapSession<T: ImapTransport = TlsStream> {
    host: String,
    port: u16,
    session: Session<T>,
    selected: Option<String>,
}

impl<T: ImapTransport> ImapSession<T> {
    /// Selects a mailbox read-write so messages can be flagged deleted.
    pub async fn select_mailbox(&mut self, name: &str) -> Result<MailboxInfo> {
        info!("Selecting folder: {}", name);

        let mailbox = self.session.select(name).await.map_err(|e| match e {
            async_imap::error::Error::No(_) => MailboxError::FolderNotFound(name.to_string()),
            e => MailboxError::ProtocolError(e.to_string()),
        })?;

        self.selected = Some(name.to_string());
        debug!(
            "Folder '{}' selected with {} messages, UIDVALIDITY={:?}",
            name, mailbox.exists, mailbox.uid_validity
        );

        Ok(MailboxInfo {
            name: name.to_string(),
            exists: mailbox.exists,
            uid_validity: mailbox.uid_validity,
        })
    }

    /// Returns the selected folder, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn require_selected(&self) -> Result<()> {
        if self.selected.is_none() {
            return Err(MailboxError::InvalidState(
                "no mailbox selected".to_string(),
            ));
        }
        Ok(())
    }

    /// Closes the session.
    ///
    /// Errors are logged and swallowed, since this runs after all work is
    /// done.
    pub async fn logout(mut self) {
        info!("Logging out from {}:{}", self.host, self.port);
        if let Err(e) = self.session.logout().await {
            warn!("IMAP logout failed: {}", e);
        }
    }
}

#[async_trait]
impl<T: ImapTransport> Mailbox for ImapSession<T> {
    async fn search(&mut self, predicate: &SearchPredicate) -> Result<Vec<MessageHandle>> {
        self.require_selected()?;

        let query = predicate.to_imap_query();
        debug!("Searching with query: {}", query);

        let uids = self
            .session
            .uid_search(&query)
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let mut uids: Vec<u32> = uids.into_iter().collect();
        if uids.is_empty() {
            debug!("No messages match {}", query);
            return Ok(Vec::new());
        }
        uids.sort_unstable();

        let uid_set = uids
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");
        debug!("Fetching {} messages with UIDs: {}", uids.len(), uid_set);

        let fetched: Vec<_> = self
            .session
            .uid_fetch(&uid_set, FETCH_ITEMS)
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))?;

        let mut messages = Vec::with_capacity(fetched.len());
        for fetch in fetched {
            let Some(uid) = fetch.uid else {
                warn!("Fetched message {} without UID, skipping", fetch.message);
                continue;
            };
            let internal_date = fetch.internal_date().map(|d| d.with_timezone(&Utc));
            let body = fetch.body().map(|b| b.to_vec());
            messages.push(MessageHandle::new(uid, internal_date, body));
        }
        messages.sort_by_key(MessageHandle::uid);

        debug!("Fetched {} messages", messages.len());
        Ok(messages)
    }

    async fn delete_message(&mut self, message: &MessageHandle) -> Result<()> {
        self.require_selected()?;

        debug!("Flagging UID {} as deleted", message.uid());
        // Checked against the tagged status; a read-only folder answers NO.
        self.session
            .run_command_and_check_ok(format!("UID STORE {} +FLAGS (\\Deleted)", message.uid()))
            .await
            .map_err(|e| MailboxError::ProtocolError(e.to_string()))
    }
}

/// Opens the TCP connection and performs the TLS handshake.
async fn dial(host: &str, port: u16) -> Result<TlsStream> {
    let addr = format!("{}:{}", host, port);
    debug!("Dialing {}", addr);

    // Establish TCP connection using std::net and wrap with async-io
    let std_stream = std::net::TcpStream::connect(&addr)
        .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;
    std_stream
        .set_nonblocking(true)
        .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;
    let tcp_stream = async_io::Async::new(std_stream)
        .map_err(|e| MailboxError::ConnectionFailed(e.to_string()))?;

    let tls = TlsConnector::new();
    let tls_stream = tls.connect(host, tcp_stream).await?;
    Ok(tls_stream)
}

/// Runs `dial`, retrying transient failures `retries` times with `delay`
/// between attempts.
pub(crate) async fn retry_dial<T, F, Fut>(retries: u32, delay: Duration, mut dial: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match dial().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                warn!(
                    "Dial failed ({}), retry {}/{} in {:?}",
                    e, attempt, retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use crate::mailbox::FlagType;

    const LOGIN_OK: &str = "A0001 OK LOGIN completed\r\n";
    const SELECT_OK: &str = "* 2 EXISTS\r\n\
        * OK [UIDVALIDITY 42] UIDs valid\r\n\
        A0002 OK [READ-WRITE] SELECT completed\r\n";

    /// Server side of a session: replays canned responses and records
    /// every byte the client writes.
    #[derive(Debug)]
    struct ScriptedStream {
        responses: Vec<u8>,
        read_pos: usize,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl AsyncRead for ScriptedStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            let remaining = &self.responses[self.read_pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.read_pos += n;
            Poll::Ready(Ok(n))
        }
    }

    impl AsyncWrite for ScriptedStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn scripted(responses: &str) -> (ImapConnection<ScriptedStream>, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = ScriptedStream {
            responses: responses.as_bytes().to_vec(),
            read_pos: 0,
            written: written.clone(),
        };
        (
            ImapConnection::from_stream("imap.example.com", 993, stream),
            written,
        )
    }

    fn sent(written: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(written.lock().unwrap().clone()).unwrap()
    }

    async fn selected(
        responses: &str,
    ) -> (ImapSession<ScriptedStream>, Arc<Mutex<Vec<u8>>>) {
        let script = format!("{}{}{}", LOGIN_OK, SELECT_OK, responses);
        let (connection, written) = scripted(&script);
        let mut session = connection
            .login("reader@example.com", &SecretString::from("hunter2"))
            .await
            .unwrap();
        session.select_mailbox("INBOX").await.unwrap();
        (session, written)
    }

    fn plus_predicate() -> SearchPredicate {
        SearchPredicate::build("reader@example.com", FlagType::Plus, "kobo", false)
    }

    fn fetch_response(seq: u32, uid: u32, raw: &str) -> String {
        format!(
            "* {} FETCH (UID {} FLAGS (\\Recent) INTERNALDATE \"01-Jul-2003 10:52:37 +0200\" BODY[] {{{}}}\r\n{})\r\n",
            seq,
            uid,
            raw.len(),
            raw
        )
    }

    #[tokio::test]
    async fn test_login_and_select() {
        let (connection, written) = scripted(&format!("{}{}", LOGIN_OK, SELECT_OK));
        let mut session = connection
            .login("reader@example.com", &SecretString::from("hunter2"))
            .await
            .unwrap();

        let info = session.select_mailbox("INBOX").await.unwrap();

        assert_eq!(
            info,
            MailboxInfo {
                name: "INBOX".to_string(),
                exists: 2,
                uid_validity: Some(42),
            }
        );
        assert_eq!(session.selected(), Some("INBOX"));
        assert_eq!(
            sent(&written),
            "A0001 LOGIN \"reader@example.com\" \"hunter2\"\r\n\
             A0002 SELECT \"INBOX\"\r\n"
        );
    }

    #[tokio::test]
    async fn test_rejected_login_is_authentication_error() {
        let (connection, _) = scripted("A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n");

        let result = connection
            .login("reader@example.com", &SecretString::from("wrong"))
            .await;

        assert!(matches!(result, Err(MailboxError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_folder_is_not_found() {
        let (connection, _) = scripted(&format!(
            "{}A0002 NO Mailbox doesn't exist: Kobo\r\n",
            LOGIN_OK
        ));
        let mut session = connection
            .login("reader@example.com", &SecretString::from("hunter2"))
            .await
            .unwrap();

        let result = session.select_mailbox("Kobo").await;

        assert!(matches!(result, Err(MailboxError::FolderNotFound(name)) if name == "Kobo"));
        assert_eq!(session.selected(), None);
    }

    #[tokio::test]
    async fn test_search_requires_selected_mailbox() {
        let (connection, _) = scripted(LOGIN_OK);
        let mut session = connection
            .login("reader@example.com", &SecretString::from("hunter2"))
            .await
            .unwrap();

        let result = session.search(&plus_predicate()).await;

        assert!(matches!(result, Err(MailboxError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_empty_search_skips_fetch() {
        let (mut session, written) =
            selected("* SEARCH\r\nA0003 OK SEARCH completed\r\n").await;

        let messages = session.search(&plus_predicate()).await.unwrap();

        assert!(messages.is_empty());
        let sent = sent(&written);
        assert!(sent.ends_with("A0003 UID SEARCH TO \"reader+kobo@example.com\"\r\n"));
        assert!(!sent.contains("FETCH"));
    }

    #[tokio::test]
    async fn test_search_fetches_matches_in_uid_order() {
        let first = "From: a@example.com\r\nSubject: one\r\n\r\nbody\r\n";
        let second = "From: b@example.com\r\nSubject: two\r\n\r\nbody\r\n";
        let responses = format!(
            "* SEARCH 9 4\r\nA0003 OK SEARCH completed\r\n{}{}A0004 OK FETCH completed\r\n",
            fetch_response(2, 9, second),
            fetch_response(1, 4, first),
        );
        let (mut session, written) = selected(&responses).await;

        let mut messages = session.search(&plus_predicate()).await.unwrap();

        assert_eq!(
            messages.iter().map(MessageHandle::uid).collect::<Vec<_>>(),
            vec![4, 9]
        );
        assert!(sent(&written)
            .ends_with("A0004 UID FETCH 4,9 (UID FLAGS INTERNALDATE BODY[])\r\n"));

        let details = messages[0].fetch_details().unwrap();
        assert_eq!(details.sender, "a@example.com");
        assert_eq!(details.subject, "one");
    }

    #[tokio::test]
    async fn test_delete_flags_without_expunge() {
        let (mut session, written) = selected(
            "* 1 FETCH (UID 7 FLAGS (\\Deleted))\r\nA0003 OK STORE completed\r\n\
             A0004 OK LOGOUT completed\r\n",
        )
        .await;

        session
            .delete_message(&MessageHandle::new(7, None, None))
            .await
            .unwrap();
        session.logout().await;

        let sent = sent(&written);
        assert!(sent.contains("A0003 UID STORE 7 +FLAGS (\\Deleted)\r\n"));
        assert!(sent.ends_with("A0004 LOGOUT\r\n"));
        assert!(!sent.contains("EXPUNGE"));
    }

    #[tokio::test]
    async fn test_rejected_store_is_protocol_error() {
        let (mut session, _) =
            selected("A0003 NO [READ-ONLY] Mailbox is read-only\r\n").await;

        let result = session
            .delete_message(&MessageHandle::new(7, None, None))
            .await;

        assert!(matches!(result, Err(MailboxError::ProtocolError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_dial_gives_up_after_retries() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<()> = retry_dial(DIAL_RETRIES, DIAL_RETRY_DELAY, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(MailboxError::ConnectionFailed("refused".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(MailboxError::ConnectionFailed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), DIAL_RETRIES + 1);
        assert_eq!(started.elapsed(), DIAL_RETRY_DELAY * DIAL_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_dial_recovers() {
        let attempts = AtomicU32::new(0);

        let result = retry_dial(DIAL_RETRIES, DIAL_RETRY_DELAY, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(MailboxError::TlsError("handshake reset".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_dial_does_not_retry_other_errors() {
        let attempts = AtomicU32::new(0);

        let result: Result<()> = retry_dial(DIAL_RETRIES, DIAL_RETRY_DELAY, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(MailboxError::AuthenticationFailed("bad password".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(MailboxError::AuthenticationFailed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Bind then release a port so nothing listens on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            ImapConnection::connect("127.0.0.1", port),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(MailboxError::ConnectionFailed(_))));
    }
}
