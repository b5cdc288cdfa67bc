//! IRC notification channel.
//!
//! One background task owns the TCP connection. Announcements are queued on
//! a bounded mpsc channel and written by that task only, so concurrent
//! callers never interleave partial lines on the socket.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ChannelError;
use crate::protocol::{self, Message};
use crate::responder::MentionResponder;
use crate::NotifyChannel;

/// Default IRC port.
pub const DEFAULT_PORT: u16 = 6667;

/// Announcements buffered while the session is (re)connecting.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// IRC session configuration.
#[derive(Debug, Clone)]
pub struct IrcConfig {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Bot nickname.
    pub nick: String,
    /// Username sent in `USER`.
    pub username: String,
    /// Real name sent in `USER`.
    pub realname: String,
    /// Channel to join and announce to.
    pub channel: String,
    /// Upper bound on establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Pause between a dropped connection and the next attempt.
    pub reconnect_delay: Duration,
}

impl IrcConfig {
    /// Configuration with default identity and timing.
    #[must_use]
    pub fn new(server: &str, port: u16, nick: &str, channel: &str) -> Self {
        Self {
            server: server.to_string(),
            port,
            nick: nick.to_string(),
            username: nick.to_lowercase(),
            realname: nick.to_string(),
            channel: channel.to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(15),
        }
    }

    /// `host:port` of the server.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// Handle to a running IRC session.
///
/// Dropping the handle stops the session task.
pub struct IrcChannel {
    address: String,
    outbound: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl IrcChannel {
    /// Start the session task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(config: IrcConfig) -> Self {
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let address = config.address();

        info!(
            address = %address,
            nick = %config.nick,
            channel = %config.channel,
            "Starting IRC session"
        );

        let task = tokio::spawn(run_session(config, queue));

        Self {
            address,
            outbound,
            task,
        }
    }
}

impl Drop for IrcChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl NotifyChannel for IrcChannel {
    fn name(&self) -> &'static str {
        "irc"
    }

    fn enabled(&self) -> bool {
        !self.outbound.is_closed()
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        match self.outbound.try_send(text.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChannelError::Other(
                "IRC outbound queue is full".to_string(),
            )),
            Err(TrySendError::Closed(_)) => Err(ChannelError::NotConnected(self.address.clone())),
        }
    }
}

/// How a single connection ended.
enum SessionEnd {
    /// Server closed the socket.
    Disconnected,
    /// The channel handle went away; stop for good.
    QueueClosed,
}

async fn run_session(config: IrcConfig, mut queue: mpsc::Receiver<String>) {
    let address = config.address();

    loop {
        match connect(&config).await {
            Ok(stream) => {
                info!(address = %address, "Connected to IRC server");
                match serve_connection(&config, stream, &mut queue).await {
                    Ok(SessionEnd::QueueClosed) => {
                        info!(address = %address, "IRC session closed");
                        return;
                    }
                    Ok(SessionEnd::Disconnected) => {
                        warn!(address = %address, "IRC server closed the connection");
                    }
                    Err(e) => {
                        warn!(address = %address, error = %e, "IRC connection failed");
                    }
                }
            }
            Err(e) => {
                warn!(address = %address, error = %e, "Could not connect to IRC server");
            }
        }

        debug!(
            delay_secs = config.reconnect_delay.as_secs(),
            "Reconnecting to IRC server after delay"
        );
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn connect(config: &IrcConfig) -> Result<TcpStream, ChannelError> {
    let address = config.address();
    match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address)).await {
        Ok(stream) => Ok(stream?),
        Err(_) => Err(ChannelError::ConnectTimeout(address)),
    }
}

async fn serve_connection(
    config: &IrcConfig,
    stream: TcpStream,
    queue: &mut mpsc::Receiver<String>,
) -> Result<SessionEnd, ChannelError> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut session = Session::new(config);
    let mut buf = Vec::new();

    for line in session.registration() {
        write.write_all(line.as_bytes()).await?;
    }

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    return Ok(SessionEnd::Disconnected);
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();
                for reply in session.handle_line(&line) {
                    write.write_all(reply.as_bytes()).await?;
                }
            }
            queued = queue.recv(), if session.joined => {
                let Some(text) = queued else {
                    // Best effort; the handle is gone either way.
                    let _ = write.write_all(b"QUIT\r\n").await;
                    return Ok(SessionEnd::QueueClosed);
                };
                write
                    .write_all(protocol::privmsg(&config.channel, &text).as_bytes())
                    .await?;
            }
        }
    }
}

/// Per-connection protocol state.
struct Session<'a> {
    config: &'a IrcConfig,
    /// Nick currently requested from the server.
    nick: String,
    responder: MentionResponder,
    joined: bool,
}

impl<'a> Session<'a> {
    fn new(config: &'a IrcConfig) -> Self {
        Self {
            config,
            nick: config.nick.clone(),
            responder: MentionResponder::new(&config.nick),
            joined: false,
        }
    }

    fn registration(&self) -> [String; 2] {
        [
            protocol::nick(&self.nick),
            protocol::user(&self.config.username, &self.config.realname),
        ]
    }

    /// React to one inbound line, returning the lines to write back.
    fn handle_line(&mut self, line: &str) -> Vec<String> {
        let Some(message) = Message::parse(line) else {
            return vec![];
        };

        match message.command {
            "PING" => vec![protocol::pong(message.trailing().unwrap_or_default())],
            // RPL_WELCOME
            "001" => {
                info!(channel = %self.config.channel, "Registered with IRC server, joining channel");
                self.joined = true;
                vec![protocol::join(&self.config.channel)]
            }
            // ERR_NICKNAMEINUSE
            "433" if !self.joined => {
                let retry = format!("{}_", self.nick);
                let taken = std::mem::replace(&mut self.nick, retry);
                warn!(taken = %taken, nick = %self.nick, "IRC nickname already in use, retrying");
                self.responder = MentionResponder::new(&self.nick);
                vec![protocol::nick(&self.nick)]
            }
            "PRIVMSG" => self.handle_privmsg(&message),
            "ERROR" => {
                warn!(reason = message.trailing().unwrap_or_default(), "IRC server error");
                vec![]
            }
            _ => vec![],
        }
    }

    fn handle_privmsg(&self, message: &Message<'_>) -> Vec<String> {
        let (Some(target), Some(sender), Some(text)) =
            (message.params.first(), message.nick(), message.trailing())
        else {
            return vec![];
        };

        if !target.eq_ignore_ascii_case(&self.config.channel) {
            return vec![];
        }

        match self.responder.reply(sender, text) {
            Some(reply) => {
                debug!(sender = %sender, "Answering channel mention");
                vec![protocol::privmsg(&self.config.channel, &reply)]
            }
            None => vec![],
        }
    }
}
