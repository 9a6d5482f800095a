//! Application layer of the chatplug client.
//!
//! Composes the domain stores into the tab lifecycle, the backend event
//! loop and the [`ChatClient`] entry point.

pub mod client;
pub mod event_router;
pub mod events;
pub mod tab_manager;

pub use client::{ChatClient, ClientRepositories, StartupSummary};
pub use event_router::{EventRouter, EventSubscription, SessionLookup};
pub use events::{BackendEvent, LifecycleKind, PluginEvent, StreamEvent};
pub use tab_manager::{RemountReport, RestoreReport, TabManager};
