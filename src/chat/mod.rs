//! The chat core: message log, request dispatcher and the session that drives them.
//!
//! Nothing in here renders or reads from the terminal; the presentation layer talks to a
//! [`ChatSession`] and listens through a [`SessionObserver`].

pub mod dispatcher;
pub mod log;
pub mod message;
pub mod session;
pub mod stream;

pub use dispatcher::{RequestDispatcher, RequestMode};
pub use message::{DocumentRef, Message, MessageId, Sender};
pub use session::{ChatSession, SessionObserver};
