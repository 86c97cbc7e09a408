/*!
 * SQLite persistence for pipeline sessions.
 *
 * Backs `SqliteArtifactStore`: session manifests and the per-stage document
 * models of each run.
 */

pub mod connection;
pub mod schema;

pub use connection::{DatabaseConnection, DatabaseStats};
