mod money;
mod period;
mod record;

pub use money::*;
pub use period::*;
pub use record::*;
