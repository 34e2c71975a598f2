//! chatrelay-core: Session and conversation management for a chat web backend
//!
//! This crate keeps a cookie-authenticated session alive, multiplexes per-user
//! conversation threads through it and turns the backend's event stream into
//! plain reply text.

pub mod codec;
pub mod conversation;
pub mod credentials;
pub mod dialogue;
pub mod error;
pub mod provider;
pub mod session;
pub mod transport;

pub use codec::ParsedReply;
pub use conversation::{ConversationHandle, ConversationRegistry, ConversationTurn};
pub use credentials::CredentialStore;
pub use dialogue::Dialogue;
pub use error::{Error, Result};
pub use provider::ProviderSettings;
pub use session::SessionManager;
pub use transport::{HttpTransport, SessionResponse, Transport};
