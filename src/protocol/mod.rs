//! Protocol surface consumed from the external messaging client.
//!
//! The wire protocol itself lives outside this crate. Warden only sees:
//! - inbound [`ProtocolEvent`]s (messages, participant changes, presence, calls)
//! - the outbound [`Connection`] capability trait
//! - a [`ProtocolClient`] that opens sessions and forgets credentials

mod client;
mod connection;
mod event;
pub mod jid;

pub use client::{ProtocolClient, Session};
pub use connection::{
    BlockAction, Connection, ConnectionError, GroupMetadata, GroupParticipant, GroupSetting,
    MessageRef, OutgoingMessage, PresenceKind, SendOptions,
};
pub use event::{
    ButtonsResponse, CallBatch, CallOffer, ConnectionState, ConnectionUpdate, ContextInfo,
    EphemeralMessage, ExtendedText, InboundMessage, LastDisconnect, MediaMessage, MessageContent,
    MessageKey, MessageKind, MessagesUpsert, ParticipantAction, ParticipantsUpdate, PresenceEntry,
    PresenceUpdate, ProtocolEvent, ProtocolMessage, UpsertKind, WireMessage,
};
