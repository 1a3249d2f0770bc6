mod keys;
mod plan;
mod profile;
mod route;
mod session;
mod snapshot;
mod tenant;

pub use keys::*;
pub use plan::*;
pub use profile::*;
pub use route::*;
pub use session::*;
pub use snapshot::*;
pub use tenant::*;
