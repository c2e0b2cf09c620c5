//! Network IMAP transport built on `async-imap`.
//!
//! Connects in one of three modes ([`TransportMode`]): plain TCP, TCP
//! upgraded with STARTTLS, or TLS from the first byte. The whole connect
//! sequence (TCP, TLS handshake, LOGIN) is bounded by the server timeout.
//!
//! Mailbox names are UTF-8 everywhere above this module; they are decoded
//! from and encoded to IMAP modified UTF-7 at the wire.

use async_imap::types::{Name, NameAttribute};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use utf7_imap::{decode_utf7_imap as decode_utf7, encode_utf7_imap as encode_utf7};

use super::stream::{tls_handshake, ImapStream};
use super::{FetchedMessage, ImapTransport, MailboxEntry, Result, SessionError, UidQuery};
use crate::domain::{ServerConfig, TransportMode, Uid};

/// Type alias for the authenticated session over either stream kind.
type ImapSession = async_imap::Session<Compat<ImapStream>>;

const FETCH_ITEMS: &str = "(UID INTERNALDATE BODY.PEEK[])";

/// Live IMAP connection.
pub struct ImapClient {
    session: ImapSession,
    host: String,
}

impl std::fmt::Debug for ImapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapClient").field("host", &self.host).finish()
    }
}

impl ImapClient {
    /// Connects and logs in.
    ///
    /// The password is passed separately so keychain lookups stay outside
    /// the transport.
    pub async fn connect(config: &ServerConfig, password: &str) -> Result<Self> {
        let secs = config.timeout.as_secs();
        tokio::time::timeout(config.timeout, Self::establish(config, password))
            .await
            .map_err(|_| SessionError::Timeout(secs))?
    }

    async fn establish(config: &ServerConfig, password: &str) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| {
                SessionError::Connection(format!("TCP connect to {} failed: {}", config.address(), e))
            })?;

        let stream = match config.mode {
            TransportMode::Plain => ImapStream::Plain(tcp),
            TransportMode::Tls => ImapStream::Tls(Box::new(tls_handshake(&config.host, tcp).await?)),
            TransportMode::StartTls => {
                let tcp = starttls(tcp).await?;
                ImapStream::Tls(Box::new(tls_handshake(&config.host, tcp).await?))
            }
        };

        tracing::debug!(
            host = %config.host,
            mode = %config.mode,
            encrypted = stream.is_tls(),
            "IMAP transport established"
        );

        let client = async_imap::Client::new(stream.compat());
        let session = client
            .login(&config.credentials.username, password)
            .await
            .map_err(|(e, _)| SessionError::Authentication(format!("IMAP login failed: {}", e)))?;

        tracing::info!(
            host = %config.host,
            username = %config.credentials.username,
            "IMAP session authenticated"
        );

        Ok(Self {
            session,
            host: config.host.clone(),
        })
    }

    /// Consumes a stream to completion.
    async fn drain_stream<T, E>(
        stream: impl futures::Stream<Item = std::result::Result<T, E>>,
    ) -> std::result::Result<(), E> {
        use futures::StreamExt;
        futures::pin_mut!(stream);
        while let Some(result) = stream.next().await {
            result?;
        }
        Ok(())
    }

    async fn list_with(&mut self, subscribed: bool) -> Result<Vec<MailboxEntry>> {
        let names: Vec<Name> = if subscribed {
            let stream = self
                .session
                .lsub(Some(""), Some("*"))
                .await
                .map_err(|e| map_error("LSUB", e))?;
            stream.try_collect().await.map_err(|e| map_error("LSUB", e))?
        } else {
            let stream = self
                .session
                .list(Some(""), Some("*"))
                .await
                .map_err(|e| map_error("LIST", e))?;
            stream.try_collect().await.map_err(|e| map_error("LIST", e))?
        };

        Ok(names.iter().map(entry_from_name).collect())
    }
}

/// Upgrades a fresh plain connection with STARTTLS, returning the TCP
/// stream positioned for the TLS handshake.
async fn starttls(mut tcp: TcpStream) -> Result<TcpStream> {
    const TAG: &str = "a0";
    {
        let mut reader = BufReader::new(&mut tcp);
        let mut line = String::new();

        reader
            .read_line(&mut line)
            .await
            .map_err(|e| SessionError::Connection(format!("reading greeting failed: {}", e)))?;
        if !line.starts_with("* OK") && !line.starts_with("* PREAUTH") {
            return Err(SessionError::Connection(format!(
                "unexpected greeting: {}",
                line.trim_end()
            )));
        }

        reader
            .get_mut()
            .write_all(format!("{} STARTTLS\r\n", TAG).as_bytes())
            .await
            .map_err(|e| SessionError::Connection(format!("sending STARTTLS failed: {}", e)))?;

        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| SessionError::Connection(format!("STARTTLS response: {}", e)))?;
            if read == 0 {
                return Err(SessionError::Connection(
                    "connection closed during STARTTLS".to_string(),
                ));
            }
            if let Some(status) = line.strip_prefix(TAG) {
                let status = status.trim();
                if status.starts_with("OK") {
                    break;
                }
                return Err(SessionError::Connection(format!("STARTTLS refused: {}", status)));
            }
        }
    }
    Ok(tcp)
}

fn map_error(command: &str, err: async_imap::error::Error) -> SessionError {
    use async_imap::error::Error;
    match err {
        Error::Io(e) => SessionError::Connection(format!("{} failed: {}", command, e)),
        Error::ConnectionLost => SessionError::Connection(format!("{}: connection lost", command)),
        other => SessionError::Command(format!("{} failed: {}", command, other)),
    }
}

/// Quotes a mailbox name for commands that pass it through verbatim.
fn quote_mailbox(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn entry_from_name(name: &Name) -> MailboxEntry {
    MailboxEntry {
        name: decode_utf7(name.name().to_string()),
        delimiter: name.delimiter().map(|d| d.to_string()),
        attributes: name.attributes().iter().map(attribute_label).collect(),
    }
}

fn attribute_label(attribute: &NameAttribute<'_>) -> String {
    match attribute {
        NameAttribute::Trash => "\\Trash".to_string(),
        NameAttribute::Junk => "\\Junk".to_string(),
        NameAttribute::NoSelect => "\\Noselect".to_string(),
        NameAttribute::Extension(label) => label.to_string(),
        other => format!("{:?}", other),
    }
}

#[async_trait]
impl ImapTransport for ImapClient {
    async fn list_mailboxes(&mut self) -> Result<Vec<MailboxEntry>> {
        let mut entries = Vec::new();
        for subscribed in [false, true] {
            match self.list_with(subscribed).await {
                Ok(found) => {
                    for entry in found {
                        if !entries.iter().any(|e: &MailboxEntry| e.name == entry.name) {
                            entries.push(entry);
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(host = %self.host, error = %e, "mailbox listing failed"),
            }
        }
        Ok(entries)
    }

    async fn select(&mut self, mailbox: &str) -> Result<()> {
        let encoded = encode_utf7(mailbox.to_string());
        tracing::trace!(mailbox, %encoded, "selecting");
        self.session
            .select(&encoded)
            .await
            .map_err(|e| map_error("SELECT", e))?;
        Ok(())
    }

    async fn uid_next(&mut self, mailbox: &str) -> Result<Option<u32>> {
        let encoded = encode_utf7(mailbox.to_string());
        match self.session.status(&encoded, "(UIDNEXT)").await {
            Ok(status) => Ok(status.uid_next),
            Err(e) => match map_error("STATUS", e) {
                fatal @ SessionError::Connection(_) => Err(fatal),
                other => {
                    tracing::debug!(mailbox, error = %other, "UIDNEXT unavailable");
                    Ok(None)
                }
            },
        }
    }

    async fn uid_search(&mut self, query: &UidQuery) -> Result<Vec<Uid>> {
        let found = self
            .session
            .uid_search(query.to_imap())
            .await
            .map_err(|e| map_error("UID SEARCH", e))?;
        let mut uids: Vec<Uid> = found.into_iter().map(Uid).collect();
        uids.sort();
        Ok(uids)
    }

    async fn uid_fetch(&mut self, uid: Uid) -> Result<Option<FetchedMessage>> {
        let stream = self
            .session
            .uid_fetch(uid.to_string(), FETCH_ITEMS)
            .await
            .map_err(|e| map_error("UID FETCH", e))?;
        let fetches: Vec<_> = stream
            .try_collect()
            .await
            .map_err(|e| map_error("UID FETCH", e))?;

        let message = fetches
            .iter()
            .filter(|fetch| fetch.uid.map_or(true, |u| u == uid.0))
            .find_map(|fetch| {
                fetch.body().map(|body| FetchedMessage {
                    uid,
                    raw: body.to_vec(),
                    internal_date: fetch.internal_date().map(|d| d.with_timezone(&Utc)),
                })
            });
        Ok(message)
    }

    async fn uid_store_deleted(&mut self, uid: Uid) -> Result<()> {
        let stream = self
            .session
            .uid_store(uid.to_string(), "+FLAGS.SILENT (\\Deleted)")
            .await
            .map_err(|e| map_error("UID STORE", e))?;
        Self::drain_stream(stream)
            .await
            .map_err(|e| map_error("UID STORE", e))
    }

    async fn uid_copy(&mut self, uid: Uid, mailbox: &str) -> Result<()> {
        let target = quote_mailbox(&encode_utf7(mailbox.to_string()));
        self.session
            .uid_copy(uid.to_string(), &target)
            .await
            .map_err(|e| map_error("UID COPY", e))
    }

    async fn expunge(&mut self) -> Result<()> {
        let stream = self
            .session
            .expunge()
            .await
            .map_err(|e| map_error("EXPUNGE", e))?;
        Self::drain_stream(stream)
            .await
            .map_err(|e| map_error("EXPUNGE", e))
    }

    async fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| map_error("LOGOUT", e))
    }
}
