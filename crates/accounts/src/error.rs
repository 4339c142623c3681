/// Crate-wide result type for account operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A protocol with this id is already registered with the context.
    #[error("protocol already registered: {protocol}")]
    DuplicateProtocol { protocol: String },

    /// The protocol already owns an account with this id.
    #[error("account {account_id} already exists in protocol {protocol}")]
    DuplicateAccount {
        protocol: String,
        account_id: String,
    },

    /// Setting the menu owner would make the owner chain loop.
    #[error("menu owner chain would form a cycle")]
    MenuOwnerCycle,
}

impl Error {
    #[must_use]
    pub fn duplicate_account(protocol: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self::DuplicateAccount {
            protocol: protocol.into(),
            account_id: account_id.into(),
        }
    }
}
