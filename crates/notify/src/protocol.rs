//! Minimal IRC line protocol: parsing inbound lines and building outbound ones.

/// Maximum length of a single IRC line, including the trailing CRLF.
pub const MAX_LINE_BYTES: usize = 512;

/// A parsed inbound IRC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<'a> {
    /// Source prefix without the leading colon (`nick!user@host` or a server name)
    pub prefix: Option<&'a str>,
    /// Command word or three-digit numeric reply
    pub command: &'a str,
    /// Parameters, the trailing parameter last and without its colon
    pub params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    /// Parse one line as received from the server.
    ///
    /// Returns `None` for blank lines or lines with no command.
    #[must_use]
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags are not used here.
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, tail)| tail);
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
            rest = tail;
            Some(prefix)
        } else {
            None
        };

        let rest = rest.trim_start_matches(' ');
        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing);
                break;
            }
            let (param, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param);
            rest = tail;
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Nickname portion of the prefix, if the prefix names a user.
    #[must_use]
    pub fn nick(&self) -> Option<&'a str> {
        self.prefix
            .map(|prefix| prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    /// Last parameter (the message text for `PRIVMSG`).
    #[must_use]
    pub fn trailing(&self) -> Option<&'a str> {
        self.params.last().copied()
    }
}

/// `NICK` registration line.
#[must_use]
pub fn nick(nick: &str) -> String {
    format!("NICK {nick}\r\n")
}

/// `USER` registration line.
#[must_use]
pub fn user(username: &str, realname: &str) -> String {
    format!("USER {username} 0 * :{realname}\r\n")
}

/// `JOIN` line for a single channel.
#[must_use]
pub fn join(channel: &str) -> String {
    format!("JOIN {channel}\r\n")
}

/// `PONG` reply echoing the server token.
#[must_use]
pub fn pong(token: &str) -> String {
    format!("PONG :{token}\r\n")
}

/// `PRIVMSG` line with the text flattened to one line and cut to fit the
/// protocol limit.
#[must_use]
pub fn privmsg(target: &str, text: &str) -> String {
    let overhead = "PRIVMSG ".len() + target.len() + " :".len() + "\r\n".len();
    let budget = MAX_LINE_BYTES.saturating_sub(overhead);
    let body = sanitize(text);
    format!("PRIVMSG {target} :{}\r\n", truncate_on_char_boundary(&body, budget))
}

/// Collapse line breaks into single spaces and drop NUL bytes.
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\0', "")
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
