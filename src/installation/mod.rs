// Installation outputs written to disk
//
// IMPORTANT:
// - Never log secrets (forum secret, redis password, administrator password).
// - All I/O should be async.

pub mod files;

pub use files::ConfigPersister;
