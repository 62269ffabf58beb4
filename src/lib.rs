//! Coordinates the editor's in-memory assets around mutating
//! version-control operations: figure out what a pull or revert will touch,
//! detach those assets from their backing files, run the operation, then
//! reload or unload each asset depending on what was left on disk.
//!
//! The version-control tool, the asset registry, and the editor UI are all
//! injected behind traits; this crate only owns the coordination protocol.

pub mod asset_host;
pub mod asset_id;
pub mod config;
pub mod coordinator;
pub mod detach;
pub mod git;
pub mod operation;
pub mod provider;
pub mod reconcile;
pub mod resolver;
pub mod ui;

pub use asset_host::{AssetHandle, AssetHost, HostEvent, InMemoryAssetHost};
pub use asset_id::{AssetId, AssetIdError, ContentRoot};
pub use config::{Config, ConfigError};
pub use coordinator::{Coordinator, OperationState, RequestError};
pub use git::{CommandOutput, CommandRunner, GitCommandRunner};
pub use operation::{CompletedOperation, OperationKind};
pub use provider::{GitProvider, Provider};
pub use ui::{Confirmation, EditorUi, HeadlessUi, ProgressToken};
