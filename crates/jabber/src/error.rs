use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JID {jid:?}: {reason}")]
    InvalidJid { jid: String, reason: &'static str },

    #[error(transparent)]
    Accounts(#[from] parley_accounts::Error),

    #[error(transparent)]
    Config(#[from] parley_config::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_jid(jid: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidJid {
            jid: jid.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
