pub mod device;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod op_type;

pub use infinix_rt as rt;
